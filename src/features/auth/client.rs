//! Account endpoints of the backend.

use super::session::{Session, User};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const SIGN_UP_PATH: &str = "/auth/sign-up/email";
pub const SIGN_IN_PATH: &str = "/auth/sign-in/email";
pub const SEND_OTP_PATH: &str = "/auth/email-otp/send-verification-otp";
pub const VERIFY_EMAIL_PATH: &str = "/auth/email-otp/verify-email";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth_rejected:{status}")]
    Server { status: u16, message: Option<String> },
    #[error("auth_network_failed:{0}")]
    Network(String),
    #[error("auth_decode_failed:{0}")]
    Decode(String),
}

impl AuthError {
    /// Text shown to the user: the server's own message when it sent one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Server {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub trait AuthTransport: Send {
    fn post_json(&self, path: &str, body: &Value) -> Result<Value, AuthError>;
}

/// Blocking JSON-over-HTTP transport.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

impl AuthTransport for HttpTransport {
    fn post_json(&self, path: &str, body: &Value) -> Result<Value, AuthError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "auth request");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let parsed = response.json::<Value>();
        if !status.is_success() {
            let message = parsed
                .ok()
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string);
            warn!(status = status.as_u16(), ?message, "auth request rejected");
            return Err(AuthError::Server {
                status: status.as_u16(),
                message,
            });
        }
        parsed.map_err(|e| AuthError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPayload {
    pub user: User,
    pub session: Session,
}

pub struct AuthClient {
    transport: Box<dyn AuthTransport>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient").finish_non_exhaustive()
    }
}

impl AuthClient {
    pub fn new(transport: Box<dyn AuthTransport>) -> Self {
        Self { transport }
    }

    pub fn http(base_url: &str) -> Result<Self, AuthError> {
        Ok(Self::new(Box::new(HttpTransport::new(base_url)?)))
    }

    pub fn sign_up(&self, request: &SignUpRequest<'_>) -> Result<Value, AuthError> {
        let body = serde_json::to_value(request).map_err(|e| AuthError::Decode(e.to_string()))?;
        self.transport.post_json(SIGN_UP_PATH, &body)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        let body = json!({ "email": email, "password": password });
        let response = self.transport.post_json(SIGN_IN_PATH, &body)?;
        extract_payload(&response)
    }

    pub fn send_verification_otp(&self, email: &str) -> Result<(), AuthError> {
        let body = json!({ "email": email, "type": "email-verification" });
        self.transport.post_json(SEND_OTP_PATH, &body).map(|_| ())
    }

    pub fn verify_email(&self, email: &str, otp: &str) -> Result<AuthPayload, AuthError> {
        let body = json!({ "email": email, "otp": otp });
        let response = self.transport.post_json(VERIFY_EMAIL_PATH, &body)?;
        extract_payload(&response)
    }
}

/// Find `{user, session}` in a response body. The backend nests it under
/// one or two `data` envelopes depending on the endpoint.
pub fn extract_payload(body: &Value) -> Result<AuthPayload, AuthError> {
    let mut cursor = body;
    for _ in 0..3 {
        if cursor.get("user").is_some() && cursor.get("session").is_some() {
            let user: User = serde_json::from_value(cursor["user"].clone())
                .map_err(|e| AuthError::Decode(e.to_string()))?;
            let session: Session = serde_json::from_value(cursor["session"].clone())
                .map_err(|e| AuthError::Decode(e.to_string()))?;
            return Ok(AuthPayload { user, session });
        }
        match cursor.get("data") {
            Some(inner) => cursor = inner,
            None => break,
        }
    }
    Err(AuthError::Decode("missing user or session".into()))
}


#[cfg(test)]
mod tests {
    use super::mock::{auth_body, MockTransport};
    use super::*;

    #[test]
    fn sign_in_posts_credentials_and_parses_payload() {
        let (transport, calls) = MockTransport::with(vec![Ok(auth_body("2030-01-01T00:00:00Z"))]);
        let client = AuthClient::new(Box::new(transport));
        let payload = client.sign_in("ana@example.org", "Secret123").unwrap();
        assert_eq!(payload.user.name, "Ana");
        assert_eq!(payload.session.token, "tok");

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, SIGN_IN_PATH);
        assert_eq!(calls[0].1["password"], "Secret123");
    }

    #[test]
    fn send_otp_uses_email_verification_type() {
        let (transport, calls) = MockTransport::with(vec![Ok(json!({ "success": true }))]);
        let client = AuthClient::new(Box::new(transport));
        client.send_verification_otp("ana@example.org").unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, SEND_OTP_PATH);
        assert_eq!(calls[0].1["type"], "email-verification");
    }

    #[test]
    fn payload_found_under_double_envelope() {
        let body = json!({ "data": auth_body("2030-01-01T00:00:00Z") });
        let payload = extract_payload(&body).unwrap();
        assert_eq!(payload.session.expires_at, "2030-01-01T00:00:00Z");
        assert!(matches!(
            extract_payload(&json!({ "data": {} })),
            Err(AuthError::Decode(_))
        ));
    }

    #[test]
    fn user_message_prefers_server_text() {
        let fallback = "Não foi possível fazer login. Tente novamente.";
        let server = AuthError::Server {
            status: 401,
            message: Some("Invalid email or password".into()),
        };
        assert_eq!(server.user_message(fallback), "Invalid email or password");

        let silent = AuthError::Server {
            status: 500,
            message: None,
        };
        assert_eq!(silent.user_message(fallback), fallback);
        assert_eq!(
            AuthError::Network("offline".into()).user_message(fallback),
            fallback
        );
    }

    #[test]
    fn http_transport_trims_base_url() {
        let transport = HttpTransport::new("http://10.0.2.2:3333/").unwrap();
        assert_eq!(transport.base_url, "http://10.0.2.2:3333");
    }
}
