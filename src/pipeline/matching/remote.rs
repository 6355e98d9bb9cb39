//! Optional remote patient search collaborator.
//!
//! The clinic backend exposes a patient search endpoint; when reachable it
//! enriches identity resolution beyond the local directory snapshot. Calls
//! are best-effort: the engine wraps every call in a fixed timeout and
//! continues with local-only results on any failure.

use async_trait::async_trait;
use serde::Deserialize;

use super::MatchError;
use crate::models::PatientRecord;

#[async_trait]
pub trait RemotePatientSearch: Send + Sync {
    /// Exact search by digits-only national ID.
    async fn search_by_national_id(
        &self,
        digits: &str,
    ) -> Result<Option<PatientRecord>, MatchError>;

    /// Free-text name search; returns server-ranked candidates.
    async fn search_by_name(&self, name: &str) -> Result<Vec<PatientRecord>, MatchError>;
}

/// Default collaborator when no backend is configured: finds nothing,
/// never errors. The engine never branches on capability presence.
pub struct NoRemoteSearch;

#[async_trait]
impl RemotePatientSearch for NoRemoteSearch {
    async fn search_by_national_id(
        &self,
        _digits: &str,
    ) -> Result<Option<PatientRecord>, MatchError> {
        Ok(None)
    }

    async fn search_by_name(&self, _name: &str) -> Result<Vec<PatientRecord>, MatchError> {
        Ok(vec![])
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    patients: Vec<PatientRecord>,
}

/// HTTP-backed search against the clinic API.
pub struct HttpPatientSearch {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPatientSearch {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RemotePatientSearch for HttpPatientSearch {
    async fn search_by_national_id(
        &self,
        digits: &str,
    ) -> Result<Option<PatientRecord>, MatchError> {
        let url = format!("{}/patients/search", self.base_url);
        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[("national_id", digits)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.patients.into_iter().next())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<PatientRecord>, MatchError> {
        let url = format!("{}/patients/search", self.base_url);
        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[("name", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.patients)
    }
}
