//! Single-attempt HTTP send.
//!
//! The story service is never retried: a request is sent once and the outcome is
//! handed back to the caller. [`SendOutcome`] structurally distinguishes success
//! from the two failure shapes so the envelope decoder cannot treat an error
//! response as success.

use reqwest::{RequestBuilder, Response};

use crate::envelope::{decode_success, rejection};
use crate::{ApiError, read_capped_body};

/// Outcome of sending one request.
#[derive(Debug)]
pub enum SendOutcome {
    /// 2xx status.
    Success(Response),
    /// Non-2xx status. The response is kept for error body inspection.
    HttpError(Response),
    /// Connection, timeout, or request construction failure.
    TransportError(reqwest::Error),
}

pub async fn send_once(request: RequestBuilder) -> SendOutcome {
    match request.send().await {
        Ok(response) if response.status().is_success() => SendOutcome::Success(response),
        Ok(response) => SendOutcome::HttpError(response),
        Err(e) => SendOutcome::TransportError(e),
    }
}

/// Send `request` once and decode the typed envelope body.
pub(crate) async fn send_and_decode<T>(request: RequestBuilder, endpoint: &str) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    match send_once(request).await {
        SendOutcome::Success(response) => {
            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;
            let decoded = decode_success(status, &bytes);
            if let Err(e) = &decoded {
                tracing::warn!(endpoint, %status, error = %e, "Story API returned an unusable body");
            }
            decoded
        }
        SendOutcome::HttpError(response) => {
            let status = response.status();
            let body = read_capped_body(response).await;
            let err = rejection(status, &body);
            tracing::warn!(endpoint, %status, error = %err, "Story API rejected request");
            Err(err)
        }
        SendOutcome::TransportError(e) => {
            tracing::warn!(endpoint, error = %e, "Story API request failed");
            Err(ApiError::Network(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn success_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = send_once(client.get(format!("{}/ping", server.uri()))).await;

        match outcome {
            SendOutcome::Success(response) => assert_eq!(response.status(), StatusCode::CREATED),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = send_once(client.get(format!("{}/ping", server.uri()))).await;

        match outcome {
            SendOutcome::HttpError(response) => {
                assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/ping", listener.local_addr().unwrap());
        drop(listener);

        let client = reqwest::Client::new();
        let outcome = send_once(client.get(url)).await;
        assert!(matches!(outcome, SendOutcome::TransportError(_)));
    }
}
