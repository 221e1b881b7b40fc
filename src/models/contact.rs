//! Counterpart contacts for the messaging view.
//!
//! The contact list is role-dependent: a patient sees doctors, a doctor
//! sees their assigned patients. The two shapes share an accessor surface
//! through the [`Contact`] union instead of relying on field-presence
//! checks. Unread counters are deliberately NOT part of these types; they
//! are session-local state owned by the conversation directory.

use serde::{Deserialize, Serialize};

/// A doctor as seen by a patient viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorContact {
    pub id: String,
    pub name: String,
    /// Medical specialization shown under the name.
    pub specialization: Option<String>,
    /// Total messages in the conversation with the viewer, as reported by
    /// the backend. Drives roster-delta unread accounting.
    #[serde(default)]
    pub message_count: u64,
}

/// A patient as seen by a doctor viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContact {
    pub id: String,
    pub name: String,
    /// Treatment the patient is registered under.
    pub treatment: Option<String>,
    #[serde(default)]
    pub message_count: u64,
}

/// Role-dependent contact shape with a shared accessor surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contact {
    Doctor(DoctorContact),
    Patient(PatientContact),
}

impl Contact {
    pub fn id(&self) -> &str {
        match self {
            Contact::Doctor(d) => &d.id,
            Contact::Patient(p) => &p.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Contact::Doctor(d) => &d.name,
            Contact::Patient(p) => &p.name,
        }
    }

    /// Role-dependent secondary label: specialization for doctors,
    /// treatment name for patients.
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            Contact::Doctor(d) => d.specialization.as_deref(),
            Contact::Patient(p) => p.treatment.as_deref(),
        }
    }

    pub fn message_count(&self) -> u64 {
        match self {
            Contact::Doctor(d) => d.message_count,
            Contact::Patient(p) => p.message_count,
        }
    }
}
