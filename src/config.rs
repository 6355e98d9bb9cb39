use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Evrak";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    "evrak=info".into()
}

/// Get the application data directory
/// ~/Evrak/ on all platforms (user-visible, per clinic deployment requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Evrak")
}

/// Default location of the document archive database.
pub fn archive_db_path() -> PathBuf {
    app_data_dir().join("archive.db")
}

/// Tunable pipeline settings. One instance per pipeline, fixed at
/// construction. Defaults mirror production values used in the clinics.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Target byte budget for the compressed PDF.
    pub target_pdf_bytes: usize,
    /// Maximum adaptive compression rounds before accepting an over-budget result.
    pub max_compression_rounds: u32,
    /// Remote patient search deadline. The pipeline continues with local
    /// results once this elapses.
    pub remote_search_timeout: std::time::Duration,
    /// Capacity of the quarantine list; oldest entries evicted first.
    pub quarantine_capacity: usize,
    /// OCR text prefix length used for fingerprinting.
    pub fingerprint_text_prefix: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_pdf_bytes: 300 * 1024,
            max_compression_rounds: 5,
            remote_search_timeout: std::time::Duration::from_secs(5),
            quarantine_capacity: 50,
            fingerprint_text_prefix: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Evrak"));
    }

    #[test]
    fn archive_db_under_app_data() {
        let db = archive_db_path();
        assert!(db.starts_with(app_data_dir()));
    }

    #[test]
    fn default_settings_match_production() {
        let s = PipelineSettings::default();
        assert_eq!(s.target_pdf_bytes, 307_200);
        assert_eq!(s.max_compression_rounds, 5);
        assert_eq!(s.quarantine_capacity, 50);
    }
}
