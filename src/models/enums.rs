use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DocumentKind {
    Prescription => "prescription",
    BatteryPrescription => "battery_prescription",
    DevicePrescription => "device_prescription",
    Audiogram => "audiogram",
    EligibilityCertificate => "eligibility_certificate",
    ExamReport => "exam_report",
    Other => "other",
});

str_enum!(MatchLevel {
    High => "high",
    Medium => "medium",
    Low => "low",
    Keyword => "keyword",
    None => "none",
});

str_enum!(WorkflowStatus {
    InquiryStarted => "inquiry_started",
    PrescriptionSaved => "prescription_saved",
    MaterialsDelivered => "materials_delivered",
    DocumentsUploaded => "documents_uploaded",
    Invoiced => "invoiced",
    PaymentReceived => "payment_received",
});

impl WorkflowStatus {
    /// Position in the forward-only workflow sequence.
    pub fn rank(&self) -> u8 {
        match self {
            Self::InquiryStarted => 0,
            Self::PrescriptionSaved => 1,
            Self::MaterialsDelivered => 2,
            Self::DocumentsUploaded => 3,
            Self::Invoiced => 4,
            Self::PaymentReceived => 5,
        }
    }

    /// Whether moving to `next` is a legal forward transition.
    /// `payment_received` is terminal; same-status transitions are rejected.
    pub fn can_advance_to(&self, next: &WorkflowStatus) -> bool {
        *self != Self::PaymentReceived && next.rank() > self.rank()
    }
}
