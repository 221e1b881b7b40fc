//! Doctor dashboard operations outside the messaging core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::RestClient;
use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::{DoctorRecord, PatientContact, PatientRecord};
use crate::session::AuthSession;

/// An assigned patient together with their last login, for the doctor's
/// patient-status table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedPatient {
    #[serde(flatten)]
    pub contact: PatientContact,
    pub last_login: Option<DateTime<Utc>>,
}

pub struct DoctorService {
    rest: RestClient,
    doctor_id: String,
}

impl DoctorService {
    pub fn new(config: &BackendConfig, session: &AuthSession) -> Self {
        Self {
            rest: RestClient::with_token(config, session.token.clone()),
            doctor_id: session.user_id.clone(),
        }
    }

    /// The logged-in doctor's own record.
    pub async fn profile(&self) -> Result<DoctorRecord, FetchError> {
        self.rest
            .get(&format!("/doctor/view/{}", self.doctor_id))
            .await
    }

    pub async fn assigned_patients(&self) -> Result<Vec<PatientContact>, FetchError> {
        self.rest.get("/doctor/assigned_patients").await
    }

    /// Assigned patients enriched with their last login time.
    pub async fn assigned_patients_with_status(&self) -> Result<Vec<AssignedPatient>, FetchError> {
        self.rest.get("/doctor/assigned_patients_status").await
    }

    pub async fn patient_details(&self, patient_id: &str) -> Result<PatientRecord, FetchError> {
        self.rest
            .get(&format!("/doctor/patient/{patient_id}"))
            .await
    }
}
