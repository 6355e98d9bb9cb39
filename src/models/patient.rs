use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A patient as known to the clinic directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// 11-digit national identity number, when on file.
    pub national_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

impl PatientRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Read-only snapshot of the patient directory, passed explicitly into the
/// identity resolution engine. No ambient lookups: whoever drives the
/// pipeline decides what this snapshot contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDirectory {
    patients: Vec<PatientRecord>,
}

impl PatientDirectory {
    pub fn new(patients: Vec<PatientRecord>) -> Self {
        Self { patients }
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatientRecord> {
        self.patients.iter()
    }

    /// Exact lookup by digits-only national ID.
    pub fn find_by_national_id(&self, digits: &str) -> Option<&PatientRecord> {
        self.patients
            .iter()
            .find(|p| p.national_id.as_deref() == Some(digits))
    }

    pub fn find_by_id(&self, id: &Uuid) -> Option<&PatientRecord> {
        self.patients.iter().find(|p| p.id == *id)
    }
}
