//! Admin dashboard operations: the registration approval queue, doctor
//! roster management, and the treatment/procedure catalog.

use serde_json::json;

use crate::backend::RestClient;
use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::{
    ClinicStatistics, DoctorPayload, DoctorRecord, PatientRecord, PatientUpdate, ProcedurePayload,
    Treatment, TreatmentDetail, TreatmentPayload,
};
use crate::session::AuthSession;

/// Authenticated wrapper for admin endpoints. Constructed from the admin's
/// session; the backend enforces the role, this type just carries it.
pub struct AdminService {
    rest: RestClient,
    admin_id: String,
}

impl AdminService {
    pub fn new(config: &BackendConfig, session: &AuthSession) -> Self {
        Self {
            rest: RestClient::with_token(config, session.token.clone()),
            admin_id: session.user_id.clone(),
        }
    }

    // ── Registration approval workflow ──────────────────────

    /// Registrations waiting in the approval queue.
    pub async fn pending_registrations(&self) -> Result<Vec<PatientRecord>, FetchError> {
        self.rest.get("/patient/read").await
    }

    /// Approve a pending registration, recording which admin did it.
    pub async fn approve_patient(&self, patient_id: &str) -> Result<(), FetchError> {
        self.rest
            .put_ok(
                &format!("/auth/api/patient_approval/{patient_id}"),
                &json!({ "approved_by": self.admin_id }),
            )
            .await
    }

    /// Decline a pending registration with a reason shown to the patient.
    pub async fn decline_patient(&self, patient_id: &str, reason: &str) -> Result<(), FetchError> {
        self.rest
            .post_ok(
                &format!("/auth/api/patient_decline/{patient_id}"),
                &json!({ "reason": reason, "declined_by": self.admin_id }),
            )
            .await
    }

    pub async fn approved_patients(&self) -> Result<Vec<PatientRecord>, FetchError> {
        self.rest
            .get(&format!("/patient/approved_patient_list/{}", self.admin_id))
            .await
    }

    pub async fn declined_patients(&self) -> Result<Vec<PatientRecord>, FetchError> {
        self.rest.get("/patient/declined_patient_list").await
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        update: &PatientUpdate,
    ) -> Result<(), FetchError> {
        self.rest
            .put_ok(&format!("/patient/update/{patient_id}"), update)
            .await
    }

    // ── Doctor roster ───────────────────────────────────────

    pub async fn doctors(&self) -> Result<Vec<DoctorRecord>, FetchError> {
        self.rest
            .get(&format!("/doctor/doctor_list/{}", self.admin_id))
            .await
    }

    pub async fn register_doctor(&self, doctor: &DoctorPayload) -> Result<(), FetchError> {
        self.rest.post_ok("/auth/api/doctor_register", doctor).await
    }

    pub async fn update_doctor(
        &self,
        doctor_id: &str,
        doctor: &DoctorPayload,
    ) -> Result<(), FetchError> {
        self.rest
            .put_ok(&format!("/doctor/update/{doctor_id}"), doctor)
            .await
    }

    pub async fn delete_doctor(&self, doctor_id: &str) -> Result<(), FetchError> {
        self.rest.delete_ok(&format!("/doctor/delete/{doctor_id}")).await
    }

    // ── Treatment / procedure catalog ───────────────────────

    pub async fn treatments(&self) -> Result<Vec<Treatment>, FetchError> {
        self.rest.get("/treatment/read").await
    }

    /// One treatment with its procedures.
    pub async fn treatment_detail(&self, treatment_id: &str) -> Result<TreatmentDetail, FetchError> {
        self.rest
            .get(&format!("/treatment/view/{treatment_id}"))
            .await
    }

    pub async fn add_treatment(&self, treatment: &TreatmentPayload) -> Result<(), FetchError> {
        self.rest.post_ok("/treatment/create", treatment).await
    }

    pub async fn update_treatment(
        &self,
        treatment_id: &str,
        treatment: &TreatmentPayload,
    ) -> Result<(), FetchError> {
        self.rest
            .put_ok(&format!("/treatment/update/{treatment_id}"), treatment)
            .await
    }

    pub async fn delete_treatment(&self, treatment_id: &str) -> Result<(), FetchError> {
        self.rest
            .delete_ok(&format!("/treatment/delete/{treatment_id}"))
            .await
    }

    pub async fn add_procedure(&self, procedure: &ProcedurePayload) -> Result<(), FetchError> {
        self.rest
            .post_ok("/treatment/procedure/create", procedure)
            .await
    }

    pub async fn update_procedure(
        &self,
        procedure_id: &str,
        procedure: &ProcedurePayload,
    ) -> Result<(), FetchError> {
        self.rest
            .put_ok(
                &format!("/treatment/procedure/update/{procedure_id}"),
                procedure,
            )
            .await
    }

    pub async fn delete_procedure(&self, procedure_id: &str) -> Result<(), FetchError> {
        self.rest
            .delete_ok(&format!("/treatment/procedure/delete/{procedure_id}"))
            .await
    }

    // ── Dashboard counters ──────────────────────────────────

    pub async fn statistics(&self) -> Result<ClinicStatistics, FetchError> {
        self.rest.get("/admins/statistics").await
    }

    pub async fn patient_total(&self) -> Result<u64, FetchError> {
        self.rest.get("/admin/patient_total_count").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Role};
    use axum::extract::Path;
    use axum::routing::{get, put};
    use axum::{Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn admin_service(base: &str) -> AdminService {
        AdminService::new(
            &BackendConfig::new(base),
            &AuthSession::new("a1", Role::Admin, "tok-a1"),
        )
    }

    #[tokio::test]
    async fn approve_records_which_admin() {
        let app = Router::new().route(
            "/auth/api/patient_approval/:id",
            put(
                |Path(id): Path<String>, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(id, "p7");
                    assert_eq!(body["approved_by"], "a1");
                    Json(json!({"message": "approved"}))
                },
            ),
        );
        let base = serve(app).await;

        admin_service(&base).approve_patient("p7").await.unwrap();
    }

    #[tokio::test]
    async fn pending_queue_decodes_records() {
        let app = Router::new().route(
            "/patient/read",
            get(|| async {
                Json(json!({
                    "data": [
                        {"id": "p7", "name": "Ana", "email": "ana@example.com",
                         "mobile": "9876543210", "gender": "female",
                         "treatment_id": "t1", "status": "pending"}
                    ]
                }))
            }),
        );
        let base = serve(app).await;

        let pending = admin_service(&base).pending_registrations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn statistics_decode_with_missing_fields() {
        let app = Router::new().route(
            "/admins/statistics",
            get(|| async { Json(json!({"data": {"total_patients": 42}})) }),
        );
        let base = serve(app).await;

        let stats = admin_service(&base).statistics().await.unwrap();
        assert_eq!(stats.total_patients, 42);
        assert_eq!(stats.total_doctors, 0);
    }
}
