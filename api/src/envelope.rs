//! Typed response envelopes.
//!
//! Parse errors happen at the serde boundary, not scattered through call sites.
//! The `error` flag is required: a body without it is not a valid response.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use storyfeed_types::StoryItem;

use crate::ApiError;

/// The fields every response carries, read before the endpoint body.
#[derive(Debug, Deserialize)]
struct Header {
    error: bool,
    #[serde(default)]
    message: String,
}

/// Endpoints whose success carries nothing beyond `message`.
#[derive(Debug, Deserialize)]
pub(crate) struct NoBody {}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    #[serde(rename = "loginResult")]
    pub login_result: LoginResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoryListBody {
    #[serde(rename = "listStory")]
    pub list_story: Vec<StoryItem>,
}

/// Payload of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResult {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    pub name: String,
    pub token: String,
}

/// Decode a 2xx body, turning `error: true` into a rejection.
///
/// The header is checked first: a rejection carries only `error` and
/// `message`, never the endpoint body.
pub(crate) fn decode_success<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T, ApiError> {
    let invalid = |e: serde_json::Error| ApiError::InvalidResponse(format!("status {status}: {e}"));

    let header: Header = serde_json::from_slice(bytes).map_err(invalid)?;
    if header.error {
        return Err(ApiError::ServerRejected {
            status: status.as_u16(),
            message: header.message,
        });
    }
    serde_json::from_slice(bytes).map_err(invalid)
}

/// Map a non-2xx response to an error, preferring the envelope `message`.
pub(crate) fn rejection(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<Header>(body)
        .ok()
        .map(|header| header.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(message)
    } else {
        ApiError::ServerRejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_login_result() {
        let body = br#"{"error":false,"message":"success","loginResult":{"userId":"user-1","name":"Ann","token":"tok"}}"#;
        let parsed: LoginBody = decode_success(StatusCode::OK, body).unwrap();
        assert_eq!(parsed.login_result.name, "Ann");
        assert_eq!(parsed.login_result.token, "tok");
        assert_eq!(parsed.login_result.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn error_flag_is_a_rejection_even_on_200() {
        let body = br#"{"error":true,"message":"Invalid password"}"#;
        let err = decode_success::<NoBody>(StatusCode::OK, body).unwrap_err();
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 200,
                message: "Invalid password".to_string()
            }
        );
    }

    #[test]
    fn error_flag_wins_over_missing_story_list() {
        let body = br#"{"error":true,"message":"Missing authentication"}"#;
        let err = decode_success::<StoryListBody>(StatusCode::OK, body).unwrap_err();
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 200,
                message: "Missing authentication".to_string()
            }
        );
    }

    #[test]
    fn error_flag_wins_over_missing_login_result() {
        let body = br#"{"error":true,"message":"Invalid password"}"#;
        let err = decode_success::<LoginBody>(StatusCode::OK, body).unwrap_err();
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 200,
                message: "Invalid password".to_string()
            }
        );
    }

    #[test]
    fn missing_error_flag_is_invalid() {
        let body = br#"{"message":"ok"}"#;
        let err = decode_success::<NoBody>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn missing_list_is_invalid() {
        let body = br#"{"error":false,"message":"Stories fetched successfully"}"#;
        let err = decode_success::<StoryListBody>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn rejection_prefers_envelope_message() {
        let err = rejection(StatusCode::BAD_REQUEST, r#"{"error":true,"message":"\"email\" must be a valid email"}"#);
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 400,
                message: "\"email\" must be a valid email".to_string()
            }
        );
    }

    #[test]
    fn rejection_falls_back_to_raw_body() {
        let err = rejection(StatusCode::BAD_GATEWAY, "  upstream down ");
        assert_eq!(
            err,
            ApiError::ServerRejected {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn unauthorized_status_maps_to_unauthorized() {
        let err = rejection(StatusCode::UNAUTHORIZED, r#"{"error":true,"message":"Missing authentication"}"#);
        assert_eq!(err, ApiError::Unauthorized("Missing authentication".to_string()));
    }
}
