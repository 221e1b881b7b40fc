//! Patient dashboard operations outside the messaging core.

use crate::backend::RestClient;
use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::{DoctorRecord, PatientRecord};
use crate::session::AuthSession;

pub struct PatientService {
    rest: RestClient,
    patient_id: String,
}

impl PatientService {
    pub fn new(config: &BackendConfig, session: &AuthSession) -> Self {
        Self {
            rest: RestClient::with_token(config, session.token.clone()),
            patient_id: session.user_id.clone(),
        }
    }

    /// The logged-in patient's own record.
    pub async fn profile(&self) -> Result<PatientRecord, FetchError> {
        self.rest
            .get(&format!("/patient/view/{}", self.patient_id))
            .await
    }

    /// Full clinic doctor roster (not just messaging contacts).
    pub async fn doctors(&self) -> Result<Vec<DoctorRecord>, FetchError> {
        self.rest.get("/doctors").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Role};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn profile_decodes_record() {
        let app = Router::new().route(
            "/patient/view/p1",
            get(|| async {
                Json(json!({
                    "data": {"id": "p1", "name": "Ana", "email": "ana@example.com",
                             "mobile": null, "gender": null, "treatment_id": "t1",
                             "status": "approved"}
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let service = PatientService::new(
            &BackendConfig::new(format!("http://{addr}")),
            &AuthSession::new("p1", Role::Patient, "tok"),
        );
        let profile = service.profile().await.unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.status, ApprovalStatus::Approved);
    }
}
