//! Patient self-registration and the admin approval workflow.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::ApprovalStatus;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("valid mobile pattern"));

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 6;

/// Self-registration payload submitted from the public registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRegistration {
    pub name: String,
    pub email: String,
    /// 10-digit contact number.
    pub mobile: String,
    pub age: u32,
    pub gender: String,
    /// Date of birth as the form submits it (YYYY-MM-DD).
    pub dob: String,
    /// Treatment the patient is registering under.
    pub treatment_id: String,
    /// Guardian / next-of-kin name.
    pub care_of: String,
    pub password: String,
}

/// Local form validation failure, rejected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Name is required")]
    MissingName,
    #[error("A valid email address is required")]
    InvalidEmail,
    #[error("Contact number must be 10 digits")]
    InvalidMobile,
    #[error("Age must be a positive number")]
    InvalidAge,
    #[error("Gender is required")]
    MissingGender,
    #[error("A treatment must be selected")]
    MissingTreatment,
    #[error("Care-of name is required")]
    MissingCareOf,
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
}

impl PatientRegistration {
    /// Field checks mirroring the registration form: all errors are
    /// collected so the form can mark every offending field at once.
    pub fn validate(&self) -> Result<(), Vec<RegistrationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(RegistrationError::MissingName);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            errors.push(RegistrationError::InvalidEmail);
        }
        if !MOBILE_RE.is_match(self.mobile.trim()) {
            errors.push(RegistrationError::InvalidMobile);
        }
        if self.age == 0 {
            errors.push(RegistrationError::InvalidAge);
        }
        if self.gender.trim().is_empty() {
            errors.push(RegistrationError::MissingGender);
        }
        if self.treatment_id.trim().is_empty() {
            errors.push(RegistrationError::MissingTreatment);
        }
        if self.care_of.trim().is_empty() {
            errors.push(RegistrationError::MissingCareOf);
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(RegistrationError::WeakPassword);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A patient record as the admin dashboard sees it: registration fields
/// plus where the record sits in the approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub treatment_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: ApprovalStatus,
}

fn default_status() -> ApprovalStatus {
    ApprovalStatus::Pending
}

/// A doctor record as managed from the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub specialization: Option<String>,
}

/// Payload for registering or updating a doctor from the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorPayload {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub gender: String,
    pub specialization: String,
    pub created_by: String,
}

/// Payload for editing a patient record from the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct PatientUpdate {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub updated_by: String,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicStatistics {
    #[serde(default)]
    pub total_patients: u64,
    #[serde(default)]
    pub total_doctors: u64,
    #[serde(default)]
    pub pending_approvals: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> PatientRegistration {
        PatientRegistration {
            name: "Ana Silva".into(),
            email: "ana@example.com".into(),
            mobile: "9876543210".into(),
            age: 34,
            gender: "female".into(),
            dob: "1992-04-17".into(),
            treatment_id: "t1".into(),
            care_of: "Rui Silva".into(),
            password: "hunter22".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(valid_registration().validate().is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        let mut reg = valid_registration();
        reg.email = "not-an-email".into();
        let errors = reg.validate().unwrap_err();
        assert_eq!(errors, vec![RegistrationError::InvalidEmail]);
    }

    #[test]
    fn rejects_short_mobile() {
        let mut reg = valid_registration();
        reg.mobile = "12345".into();
        let errors = reg.validate().unwrap_err();
        assert_eq!(errors, vec![RegistrationError::InvalidMobile]);
    }

    #[test]
    fn rejects_short_password() {
        let mut reg = valid_registration();
        reg.password = "abc".into();
        let errors = reg.validate().unwrap_err();
        assert_eq!(errors, vec![RegistrationError::WeakPassword]);
    }

    #[test]
    fn collects_every_failing_field() {
        let reg = PatientRegistration {
            name: "  ".into(),
            email: "bad".into(),
            mobile: "x".into(),
            age: 0,
            gender: String::new(),
            dob: String::new(),
            treatment_id: String::new(),
            care_of: String::new(),
            password: "123".into(),
        };
        let errors = reg.validate().unwrap_err();
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn patient_record_status_defaults_to_pending() {
        let record: PatientRecord = serde_json::from_str(
            r#"{"id":"p1","name":"Ana","email":"ana@example.com",
                "mobile":null,"gender":null,"treatment_id":null}"#,
        )
        .unwrap();
        assert_eq!(record.status, ApprovalStatus::Pending);
    }
}
