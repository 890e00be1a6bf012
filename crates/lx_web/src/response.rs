use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use lx_core::Error;
use serde::Serialize;
use tracing::error;

/// Body shape shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

pub type ApiResult<T> = std::result::Result<Json<Envelope<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
        code: None,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            Error::Validation { code, .. } => (StatusCode::BAD_REQUEST, *code),
            Error::Auth { code, .. } if *code == "INVALID_CREDENTIALS" || *code == "UNAUTHORIZED" => {
                (StatusCode::UNAUTHORIZED, *code)
            }
            Error::Auth { code, .. } => (StatusCode::BAD_REQUEST, *code),
            Error::Conflict { code, .. } => (StatusCode::CONFLICT, *code),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
            Error::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("❌ Request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = Envelope::<()> {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("WEAK_PASSWORD", "short"), StatusCode::BAD_REQUEST, "WEAK_PASSWORD"),
            (Error::auth("INVALID_CREDENTIALS", "no"), StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (Error::auth("AUTH_ERROR", "odd"), StatusCode::BAD_REQUEST, "AUTH_ERROR"),
            (Error::conflict("USERNAME_TAKEN", "taken"), StatusCode::CONFLICT, "USERNAME_TAKEN"),
            (Error::NotFound("a".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (Error::NotConfigured("Supabase"), StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
            (Error::Timeout, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(ApiError(err).status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let Ok(Json(envelope)) = ok(vec![1, 2]) else {
            panic!("ok() must succeed");
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("error").is_none());
        assert!(json.get("timestamp").is_some());
    }
}
