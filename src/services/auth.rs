//! Login, self-registration, and password recovery.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::RestClient;
use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::{PatientRegistration, Role, Treatment};
use crate::session::AuthSession;

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Login response payload.
#[derive(Deserialize)]
struct LoginData {
    token: String,
    #[serde(rename = "userType")]
    user_type: String,
    user_id: String,
}

/// Unauthenticated entry points: everything reachable before a bearer
/// token exists.
pub struct AuthService {
    rest: RestClient,
}

impl AuthService {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            rest: RestClient::new(config),
        }
    }

    /// Exchange credentials for a session. The returned [`AuthSession`]
    /// is what every other component takes at construction.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, FetchError> {
        let data: LoginData = self.rest.post("/auth/api/login", credentials).await?;
        let role = Role::from_str(&data.user_type).map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::info!(user_id = %data.user_id, role = %role, "Login succeeded");
        Ok(AuthSession::new(data.user_id, role, data.token))
    }

    /// Submit a self-registration. The account stays in the pending queue
    /// until an admin approves it; field validation is the form's concern
    /// (see [`PatientRegistration::validate`]).
    pub async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<(), FetchError> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            registration: &'a PatientRegistration,
            #[serde(rename = "userType")]
            user_type: &'static str,
        }
        self.rest
            .post_ok(
                "/auth/api/patient_register",
                &Wire {
                    registration,
                    user_type: Role::Patient.as_str(),
                },
            )
            .await
    }

    /// Request a password-reset OTP for `email`.
    pub async fn forgot_password(&self, email: &str) -> Result<(), FetchError> {
        self.rest
            .post_ok("/auth/api/forgot_password", &serde_json::json!({ "email": email }))
            .await
    }

    /// Check the OTP sent to `email`.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), FetchError> {
        self.rest
            .post_ok(
                "/auth/api/otp_verification",
                &serde_json::json!({ "email": email, "otp": otp }),
            )
            .await
    }

    /// Set a new password after OTP verification.
    pub async fn reset_password(&self, email: &str, password: &str) -> Result<(), FetchError> {
        self.rest
            .post_ok(
                "/auth/api/reset_password",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await
    }

    /// Public treatment catalog, used by the registration form dropdown.
    pub async fn treatments(&self) -> Result<Vec<Treatment>, FetchError> {
        self.rest.get("/treatment/read").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn login_builds_session_from_response() {
        let app = Router::new().route(
            "/auth/api/login",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["email"], "ana@example.com");
                Json(json!({
                    "data": {"token": "tok-1", "userType": "patient", "user_id": "p1"}
                }))
            }),
        );
        let base = serve(app).await;

        let service = AuthService::new(&BackendConfig::new(&base));
        let session = service
            .login(&LoginCredentials {
                email: "ana@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, "p1");
        assert_eq!(session.role, Role::Patient);
        assert_eq!(session.token, "tok-1");
    }

    #[tokio::test]
    async fn login_rejects_unknown_role() {
        let app = Router::new().route(
            "/auth/api/login",
            post(|| async {
                Json(json!({
                    "data": {"token": "tok-1", "userType": "receptionist", "user_id": "x1"}
                }))
            }),
        );
        let base = serve(app).await;

        let service = AuthService::new(&BackendConfig::new(&base));
        let err = service
            .login(&LoginCredentials {
                email: "x@example.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn registration_is_tagged_as_patient() {
        let app = Router::new().route(
            "/auth/api/patient_register",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["userType"], "patient");
                assert_eq!(body["name"], "Ana Silva");
                assert_eq!(body["treatment_id"], "t1");
                Json(json!({"message": "registered"}))
            }),
        );
        let base = serve(app).await;

        let registration = PatientRegistration {
            name: "Ana Silva".into(),
            email: "ana@example.com".into(),
            mobile: "9876543210".into(),
            age: 34,
            gender: "female".into(),
            dob: "1992-04-17".into(),
            treatment_id: "t1".into(),
            care_of: "Rui Silva".into(),
            password: "hunter22".into(),
        };
        AuthService::new(&BackendConfig::new(&base))
            .register_patient(&registration)
            .await
            .unwrap();
    }
}
