//! Treatment and procedure catalog entries.

use serde::{Deserialize, Serialize};

/// A treatment offered by the clinic. Patients register under one of
/// these; procedures hang off them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    #[serde(rename = "treatment_name")]
    pub name: String,
    pub description: Option<String>,
}

/// A procedure performed under a treatment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentProcedure {
    pub id: String,
    pub treatment_id: String,
    #[serde(rename = "procedure_name")]
    pub name: String,
    pub description: Option<String>,
}

/// A treatment together with its procedures, as the detail view returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentDetail {
    #[serde(flatten)]
    pub treatment: Treatment,
    #[serde(default)]
    pub procedures: Vec<TreatmentProcedure>,
}

/// Payload for creating or updating a treatment.
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentPayload {
    #[serde(rename = "treatment_name")]
    pub name: String,
    pub description: Option<String>,
    /// Admin id recorded against the change.
    pub created_by: String,
}

/// Payload for creating or updating a procedure.
#[derive(Debug, Clone, Serialize)]
pub struct ProcedurePayload {
    pub treatment_id: String,
    #[serde(rename = "procedure_name")]
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
}
