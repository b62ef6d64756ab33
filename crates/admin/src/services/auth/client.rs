//! REST client for the hosted auth API (GoTrue dialect).
//!
//! # API Reference
//!
//! - Base URL: `{AUTH_API_URL}/auth/v1/`
//! - Authentication: project key in the `apikey` header, plus
//!   `Authorization: Bearer <token>` (the project key for anonymous calls,
//!   the user's access token otherwise)

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use dazzle_core::{Email, Principal, UserId};

use super::{AuthError, AuthGrant, AuthProvider, AuthTokens, SignUp};
use crate::config::AuthApiConfig;

/// Auth API client.
#[derive(Clone)]
pub struct GoTrueClient {
    inner: Arc<GoTrueClientInner>,
}

struct GoTrueClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl GoTrueClient {
    /// Create a new auth API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value, the base URL
    /// cannot carry a path, or the HTTP client fails to build.
    pub fn new(config: &AuthApiConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| AuthError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(GoTrueClientInner {
                client,
                base_url: auth_base(&config.url)?,
                api_key: config.api_key.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| AuthError::Parse(format!("invalid endpoint {path}: {e}")))
    }

    fn anon_bearer(&self) -> String {
        format!("Bearer {}", self.inner.api_key.expose_secret())
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthGrant, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .inner
            .client
            .post(url)
            .header("Authorization", self.anon_bearer())
            .json(&body)
            .send()
            .await?;

        let session: SessionResponse = handle_response(response).await?;
        session.into_grant(Utc::now())
    }
}

impl AuthProvider for GoTrueClient {
    #[tracing::instrument(skip_all, fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        full_name: &str,
        redirect_to: &Url,
    ) -> Result<SignUp, AuthError> {
        let mut url = self.endpoint("signup")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", redirect_to.as_str());

        let response = self
            .inner
            .client
            .post(url)
            .header("Authorization", self.anon_bearer())
            .json(&json!({
                "email": email.as_str(),
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        let body: SignUpResponse = handle_response(response).await?;
        body.into_sign_up(Utc::now())
    }

    #[tracing::instrument(skip_all, fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthGrant, AuthError> {
        self.token_grant(
            "password",
            json!({ "email": email.as_str(), "password": password }),
        )
        .await
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<AuthGrant, AuthError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }

    #[tracing::instrument(skip_all)]
    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), AuthError> {
        let response = self
            .inner
            .client
            .put(self.endpoint("user")?)
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }))
            .send()
            .await?;

        let _user: UserResponse = handle_response(response).await?;
        Ok(())
    }
}

/// `{AUTH_API_URL}/auth/v1/` with a trailing slash so `join` appends.
fn auth_base(url: &Url) -> Result<Url, AuthError> {
    let mut base = url.clone();
    {
        let mut segments = base
            .path_segments_mut()
            .map_err(|()| AuthError::Parse(format!("auth URL cannot be a base: {url}")))?;
        segments.pop_if_empty().extend(["auth", "v1", ""]);
    }
    Ok(base)
}

/// Handle API response and parse JSON.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AuthError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| AuthError::Parse(format!("Failed to parse response: {e}")));
    }
    Err(parse_error(response).await)
}

async fn parse_error(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default();
    classify_error(status, &parsed, &body)
}

// =============================================================================
// Wire types
// =============================================================================

/// Error bodies come in two generations: `{error, error_description}` and
/// `{code, error_code, msg}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
    }
}

fn classify_error(status: u16, body: &ErrorBody, raw: &str) -> AuthError {
    if status == 429 {
        return AuthError::RateLimited;
    }

    let code = body.error_code.as_deref().or(body.error.as_deref());
    let message = body.message().unwrap_or(raw);
    let lower = message.to_lowercase();

    match code {
        Some("invalid_credentials") => return AuthError::InvalidCredentials,
        Some("email_not_confirmed") => return AuthError::EmailNotConfirmed,
        Some("user_already_exists" | "email_exists") => return AuthError::UserAlreadyRegistered,
        Some("weak_password") => return AuthError::WeakPassword(message.to_owned()),
        Some(
            "refresh_token_not_found" | "refresh_token_already_used" | "session_not_found",
        ) => return AuthError::SessionExpired,
        _ => {}
    }

    if lower.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lower.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if lower.contains("already registered") {
        AuthError::UserAlreadyRegistered
    } else if lower.contains("refresh token") {
        AuthError::SessionExpired
    } else if lower.contains("password should be") {
        AuthError::WeakPassword(message.to_owned())
    } else if code == Some("invalid_grant") {
        AuthError::InvalidCredentials
    } else {
        AuthError::Api {
            status,
            message: message.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
    email_confirmed_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    last_sign_in_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    user_metadata: Option<UserMetadata>,
}

impl TryFrom<UserResponse> for Principal {
    type Error = AuthError;

    fn try_from(user: UserResponse) -> Result<Self, Self::Error> {
        let raw_email = user
            .email
            .ok_or_else(|| AuthError::Parse("user has no email".to_owned()))?;
        let email = Email::parse(&raw_email)
            .map_err(|e| AuthError::Parse(format!("invalid email from auth API: {e}")))?;

        Ok(Self {
            id: UserId::new(user.id),
            email,
            email_verified: user.email_confirmed_at.or(user.confirmed_at).is_some(),
            full_name: user.user_metadata.and_then(|m| m.full_name),
            last_sign_in_at: user.last_sign_in_at,
            created_at: user.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    /// Unix seconds; newer servers include it.
    expires_at: Option<i64>,
    user: UserResponse,
}

impl SessionResponse {
    fn into_grant(self, now: DateTime<Utc>) -> Result<AuthGrant, AuthError> {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in));

        Ok(AuthGrant {
            principal: self.user.try_into()?,
            tokens: AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
        })
    }
}

/// Sign-up returns a session when the account is confirmed immediately, and
/// the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Box<SessionResponse>),
    User(UserResponse),
}

impl SignUpResponse {
    fn into_sign_up(self, now: DateTime<Utc>) -> Result<SignUp, AuthError> {
        match self {
            Self::Session(session) => {
                let grant = session.into_grant(now)?;
                Ok(SignUp {
                    principal: grant.principal,
                    tokens: Some(grant.tokens),
                })
            }
            Self::User(user) => Ok(SignUp {
                principal: user.try_into()?,
                tokens: None,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_JSON: &str = r#"{
        "id": "6f1c3a52-5f7e-4d38-9d8a-0b3c2c7f6a10",
        "email": "ann@x.com",
        "email_confirmed_at": "2026-01-02T03:04:05Z",
        "last_sign_in_at": "2026-03-01T10:00:00Z",
        "created_at": "2026-01-01T00:00:00Z",
        "user_metadata": { "full_name": "Ann Lee" }
    }"#;

    #[test]
    fn test_auth_base_appends_path() {
        let base = auth_base(&Url::parse("https://abc.backend.test").unwrap()).unwrap();
        assert_eq!(base.as_str(), "https://abc.backend.test/auth/v1/");
        assert_eq!(
            base.join("token").unwrap().as_str(),
            "https://abc.backend.test/auth/v1/token"
        );

        let nested = auth_base(&Url::parse("http://localhost:54321/").unwrap()).unwrap();
        assert_eq!(nested.as_str(), "http://localhost:54321/auth/v1/");
    }

    #[test]
    fn test_user_response_to_principal() {
        let user: UserResponse = serde_json::from_str(USER_JSON).unwrap();
        let principal = Principal::try_from(user).unwrap();
        assert_eq!(principal.email.as_str(), "ann@x.com");
        assert!(principal.email_verified);
        assert_eq!(principal.full_name.as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn test_signup_without_session_is_user() {
        let body: SignUpResponse = serde_json::from_str(USER_JSON).unwrap();
        let sign_up = body.into_sign_up(Utc::now()).unwrap();
        assert!(sign_up.tokens.is_none());
        assert_eq!(sign_up.principal.display_name(), "Ann Lee");
    }

    #[test]
    fn test_signup_with_session() {
        let json = format!(
            r#"{{"access_token":"at","token_type":"bearer","expires_in":3600,
                "refresh_token":"rt","user":{USER_JSON}}}"#
        );
        let body: SignUpResponse = serde_json::from_str(&json).unwrap();
        let now = Utc::now();
        let sign_up = body.into_sign_up(now).unwrap();
        let tokens = sign_up.tokens.unwrap();
        assert_eq!(tokens.refresh_token, "rt");
        assert_eq!(tokens.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn test_session_prefers_absolute_expiry() {
        let json = format!(
            r#"{{"access_token":"at","expires_in":3600,"expires_at":1893456000,
                "refresh_token":"rt","user":{USER_JSON}}}"#
        );
        let session: SessionResponse = serde_json::from_str(&json).unwrap();
        let grant = session.into_grant(Utc::now()).unwrap();
        assert_eq!(grant.tokens.expires_at.timestamp(), 1_893_456_000);
    }

    #[test]
    fn test_classify_new_style_errors() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert!(matches!(
            classify_error(400, &body, ""),
            AuthError::InvalidCredentials
        ));

        let body: ErrorBody =
            serde_json::from_str(r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#)
                .unwrap();
        assert!(matches!(
            classify_error(422, &body, ""),
            AuthError::WeakPassword(msg) if msg.starts_with("Password should")
        ));
    }

    #[test]
    fn test_classify_legacy_errors() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
        )
        .unwrap();
        assert!(matches!(
            classify_error(400, &body, ""),
            AuthError::EmailNotConfirmed
        ));

        let body: ErrorBody =
            serde_json::from_str(r#"{"msg":"User already registered"}"#).unwrap();
        assert!(matches!(
            classify_error(422, &body, ""),
            AuthError::UserAlreadyRegistered
        ));
    }

    #[test]
    fn test_classify_rate_limit_and_unknown() {
        assert!(matches!(
            classify_error(429, &ErrorBody::default(), ""),
            AuthError::RateLimited
        ));
        assert!(matches!(
            classify_error(500, &ErrorBody::default(), "upstream down"),
            AuthError::Api { status: 500, message } if message == "upstream down"
        ));
    }
}
