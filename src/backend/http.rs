//! REST client and the HTTP implementation of the backend seam.
//!
//! All wire access goes through [`RestClient`]: base-URL normalization,
//! bearer-token injection, and the `{ data, message }` response envelope
//! live here and nowhere else.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChatBackend, OutgoingMessage, SendReceipt};
use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::{ChatMessage, Contact, ConversationKey, DoctorContact, PatientContact, Role};
use crate::session::AuthSession;

// ═══════════════════════════════════════════════════════════
// RestClient
// ═══════════════════════════════════════════════════════════

/// Thin wrapper over `reqwest` bound to one backend base URL and,
/// optionally, one bearer token.
pub struct RestClient {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    http: reqwest::Client,
}

/// Every backend response wraps its payload: `data` on success, `message`
/// on failure (sometimes both are present).
#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    message: Option<String>,
}

impl RestClient {
    /// Unauthenticated client (login, registration, public catalog).
    pub fn new(config: &BackendConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout_secs: config.request_timeout_secs,
            http,
        }
    }

    /// Authenticated client carrying the session's bearer token.
    pub fn with_token(config: &BackendConfig, token: impl Into<String>) -> Self {
        let mut client = Self::new(config);
        client.token = Some(token.into());
        client
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        req
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::PUT, path).json(body)).await
    }

    /// POST where only success matters; tolerates an empty `data` field.
    pub async fn post_ok<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), FetchError> {
        self.execute_envelope::<serde_json::Value>(self.request(Method::POST, path).json(body))
            .await
            .map(|_| ())
    }

    /// PUT where only success matters.
    pub async fn put_ok<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), FetchError> {
        self.execute_envelope::<serde_json::Value>(self.request(Method::PUT, path).json(body))
            .await
            .map(|_| ())
    }

    /// DELETE where only success matters.
    pub async fn delete_ok(&self, path: &str) -> Result<(), FetchError> {
        self.execute_envelope::<serde_json::Value>(self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let envelope = self.execute_envelope::<T>(req).await?;
        envelope
            .data
            .ok_or_else(|| FetchError::Decode("response envelope missing data".into()))
    }

    async fn execute_envelope<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>, FetchError> {
        let response = req.send().await.map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            // Prefer the backend's own message; fall back to the HTTP reason.
            let message = response
                .json::<Envelope<serde_json::Value>>()
                .await
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn map_transport(&self, err: reqwest::Error) -> FetchError {
        if err.is_connect() {
            FetchError::Connect(self.base_url.clone())
        } else if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Wire shapes for the messaging endpoints
// ═══════════════════════════════════════════════════════════

/// A stored message as the backend returns it: both participant ids plus
/// the author, from which the recipient is derived.
#[derive(Deserialize)]
struct WireMessage {
    id: Option<String>,
    doctor_id: String,
    patient_id: String,
    sender_id: String,
    message: String,
    timestamp: DateTime<Utc>,
}

impl WireMessage {
    fn into_chat_message(self) -> ChatMessage {
        let recipient_id = if self.sender_id == self.doctor_id {
            self.patient_id
        } else {
            self.doctor_id
        };
        ChatMessage {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id,
            body: self.message,
            timestamp: self.timestamp,
            pending: false,
            local_key: None,
        }
    }
}

#[derive(Serialize)]
struct WireOutgoing<'a> {
    doctor_id: &'a str,
    patient_id: &'a str,
    sender_id: &'a str,
    message: &'a str,
    timestamp: DateTime<Utc>,
    local_key: Uuid,
}

// ═══════════════════════════════════════════════════════════
// HttpBackend
// ═══════════════════════════════════════════════════════════

/// REST implementation of [`ChatBackend`], bound to one authenticated
/// viewer. Endpoint selection is role-dependent: the backend exposes
/// separate paths for each side of a conversation.
pub struct HttpBackend {
    rest: RestClient,
    session: AuthSession,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, session: AuthSession) -> Self {
        Self {
            rest: RestClient::with_token(config, session.token.clone()),
            session,
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_contacts(&self) -> Result<Vec<Contact>, FetchError> {
        match self.session.role {
            Role::Patient => {
                let doctors: Vec<DoctorContact> = self
                    .rest
                    .get(&format!("/doctor/doctor_list/{}", self.session.user_id))
                    .await?;
                Ok(doctors.into_iter().map(Contact::Doctor).collect())
            }
            Role::Doctor => {
                let patients: Vec<PatientContact> =
                    self.rest.get("/doctor/assigned_patients").await?;
                Ok(patients.into_iter().map(Contact::Patient).collect())
            }
            Role::Admin => Err(FetchError::Unsupported {
                operation: "contact roster",
                role: Role::Admin,
            }),
        }
    }

    async fn conversation_history(
        &self,
        key: &ConversationKey,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        let path = match self.session.role {
            Role::Patient => format!(
                "/queries/patient/{}/doctor/{}",
                key.patient_id, key.doctor_id
            ),
            Role::Doctor => format!(
                "/queries/doctor/{}/patient/{}",
                key.doctor_id, key.patient_id
            ),
            Role::Admin => {
                return Err(FetchError::Unsupported {
                    operation: "conversation history",
                    role: Role::Admin,
                })
            }
        };
        let wire: Vec<WireMessage> = self.rest.get(&path).await?;
        Ok(wire.into_iter().map(WireMessage::into_chat_message).collect())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt, FetchError> {
        let (path, key) = match self.session.role {
            Role::Patient => (
                "/queries/patient_create",
                ConversationKey::new(&message.recipient_id, &message.sender_id),
            ),
            Role::Doctor => (
                "/queries/doctor_create",
                ConversationKey::new(&message.sender_id, &message.recipient_id),
            ),
            Role::Admin => {
                return Err(FetchError::Unsupported {
                    operation: "message send",
                    role: Role::Admin,
                })
            }
        };
        let wire = WireOutgoing {
            doctor_id: &key.doctor_id,
            patient_id: &key.patient_id,
            sender_id: &message.sender_id,
            message: &message.body,
            timestamp: message.timestamp,
            local_key: message.local_key,
        };
        self.rest.post(path, &wire).await
    }
}

// ═══════════════════════════════════════════════════════════
// Tests: against a local axum double of the backend
// ═══════════════════════════════════════════════════════════
