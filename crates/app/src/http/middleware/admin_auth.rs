//! Admin gate. Tokens are `base64url(payload).base64url(hmac_sha256)`; the
//! payload carries an expiry and the caller's role. Issuing tokens belongs to
//! the session service, this side only verifies them.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::state::AppState;

const ADMIN_COOKIE_NAME: &str = "backstage_admin";
const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("admin auth not configured")]
    MissingConfig,
    #[error("admin token required")]
    MissingToken,
    #[error("admin token invalid")]
    InvalidToken,
    #[error("admin token expired")]
    Expired,
    #[error("admin role required")]
    Forbidden,
}

#[derive(Debug, Serialize, Deserialize)]
struct AdminTokenPayload {
    exp: i64,
    role: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AdminAuthError> {
    let secret = state
        .config
        .admin_token_secret
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(AdminAuthError::MissingConfig)?;

    let token = extract_bearer_token(&request)
        .or_else(|| extract_cookie(&request, ADMIN_COOKIE_NAME))
        .ok_or(AdminAuthError::MissingToken)?;
    let payload = verify_token(secret, &token, Utc::now().timestamp())?;
    if payload.role != ADMIN_ROLE {
        debug!(role = %payload.role, "non-admin token rejected");
        return Err(AdminAuthError::Forbidden);
    }
    Ok(next.run(request).await)
}

fn verify_token(secret: &str, token: &str, now: i64) -> Result<AdminTokenPayload, AdminAuthError> {
    let (payload_b64, sig_b64) = token
        .split_once('.')
        .filter(|(payload, sig)| !payload.is_empty() && !sig.is_empty())
        .ok_or(AdminAuthError::InvalidToken)?;
    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AdminAuthError::InvalidToken)?;
    let mut mac = token_mac(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AdminAuthError::InvalidToken)?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AdminAuthError::InvalidToken)?;
    let payload: AdminTokenPayload =
        serde_json::from_slice(&bytes).map_err(|_| AdminAuthError::InvalidToken)?;
    if payload.exp <= now {
        return Err(AdminAuthError::Expired);
    }
    Ok(payload)
}

fn token_mac(secret: &str) -> Result<Hmac<Sha256>, AdminAuthError> {
    Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| AdminAuthError::MissingConfig)
}

#[cfg(test)]
pub(crate) fn issue_token(secret: &str, role: &str, max_age_secs: i64) -> String {
    let payload = AdminTokenPayload {
        exp: Utc::now().timestamp().saturating_add(max_age_secs),
        role: role.to_string(),
    };
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
    let mut mac = token_mac(secret).unwrap();
    mac.update(payload_b64.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{payload_b64}.{signature}")
}

fn extract_bearer_token<B>(request: &Request<B>) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let value = header.trim().strip_prefix("Bearer ")?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn extract_cookie<B>(request: &Request<B>, name: &str) -> Option<String> {
    let header = request.headers().get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminAuthError::MissingConfig => StatusCode::SERVICE_UNAVAILABLE,
            AdminAuthError::MissingToken
            | AdminAuthError::InvalidToken
            | AdminAuthError::Expired => StatusCode::UNAUTHORIZED,
            AdminAuthError::Forbidden => StatusCode::FORBIDDEN,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let token = issue_token("secret", "admin", 60);
        let payload = verify_token("secret", &token, Utc::now().timestamp()).unwrap();
        assert_eq!(payload.role, "admin");
    }

    #[test]
    fn wrong_secret_or_tampering_fails() {
        let token = issue_token("secret", "admin", 60);
        assert!(matches!(
            verify_token("other", &token, Utc::now().timestamp()),
            Err(AdminAuthError::InvalidToken)
        ));
        let (_, sig) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"exp":9999999999,"role":"admin"}"#);
        let forged = format!("{forged_payload}.{sig}");
        assert!(verify_token("secret", &forged, 0).is_err());
        assert!(verify_token("secret", "garbage", 0).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("secret", "admin", 60);
        let later = Utc::now().timestamp() + 120;
        assert!(matches!(
            verify_token("secret", &token, later),
            Err(AdminAuthError::Expired)
        ));
    }

    #[test]
    fn token_read_from_header_or_cookie() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer abc.def")
            .body(())
            .unwrap();
        assert_eq!(extract_bearer_token(&request).as_deref(), Some("abc.def"));

        let request = Request::builder()
            .header(COOKIE, "theme=dark; backstage_admin=xyz.123")
            .body(())
            .unwrap();
        assert_eq!(
            extract_cookie(&request, ADMIN_COOKIE_NAME).as_deref(),
            Some("xyz.123")
        );
    }
}
