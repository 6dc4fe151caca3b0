//! Bounded JSON request decoding
//!
//! Every JSON body goes through [`decode`], which enforces a byte
//! ceiling, a read deadline, and an exactly-one-value rule before serde
//! ever sees the payload. Violations surface as precise 4xx statuses
//! rather than a generic bad-request.

use crate::ApiError;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Limits applied while reading a JSON body
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_bytes: usize,
    pub deadline: Option<Duration>,
}

/// Read and deserialize the request body as a single JSON value.
pub async fn decode<T>(limits: &DecodeLimits, req: Request) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let (parts, body) = req.into_parts();

    let media_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if !media_type.eq_ignore_ascii_case("application/json") {
        return Err(ApiError::status(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected request body to be application/json",
        ));
    }

    let read = read_bounded(body, limits.max_bytes);
    let buf = match limits.deadline {
        Some(deadline) => tokio::time::timeout(deadline, read).await.map_err(|_| {
            ApiError::status(
                StatusCode::REQUEST_TIMEOUT,
                "failed to read request body in time, please try again",
            )
        })??,
        None => read.await?,
    };

    parse_single(&buf)
}

async fn read_bounded(body: Body, max_bytes: usize) -> Result<Bytes, ApiError> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            ApiError::status(
                StatusCode::BAD_REQUEST,
                format!("request body could not be read: {err}"),
            )
        })?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(ApiError::status(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("maximum allowed request size is {max_bytes} bytes"),
            ));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn parse_single<T>(buf: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<T>();
    let value = match values.next() {
        None => {
            return Err(ApiError::status(
                StatusCode::BAD_REQUEST,
                "request body must not be empty",
            ))
        }
        Some(Ok(value)) => value,
        Some(Err(err)) => return Err(classify(err)),
    };
    // trailing whitespace is fine, a second value is not
    if values.next().is_some() {
        return Err(ApiError::status(
            StatusCode::BAD_REQUEST,
            "request body must only contain a single JSON value",
        ));
    }
    Ok(value)
}

fn classify(err: serde_json::Error) -> ApiError {
    use serde_json::error::Category;
    let reason = match err.classify() {
        Category::Syntax | Category::Eof => format!(
            "request body contains malformed JSON (at line {}, column {})",
            err.line(),
            err.column()
        ),
        // serde's data errors already name the offending field
        Category::Data => format!("request body is invalid: {err}"),
        Category::Io => "request body could not be read properly".to_owned(),
    };
    ApiError::status(StatusCode::BAD_REQUEST, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        name: String,
    }

    fn limits() -> DecodeLimits {
        DecodeLimits {
            max_bytes: 64,
            deadline: Some(Duration::from_secs(1)),
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn decodes_single_value() {
        let payload: Payload = decode(&limits(), json_request(r#"{"name": "a"}"#))
            .await
            .unwrap();
        assert_eq!(payload.name, "a");
    }

    #[tokio::test]
    async fn rejects_wrong_content_type() {
        let req = HttpRequest::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"name": "a"}"#))
            .unwrap();
        let err = decode::<Payload>(&limits(), req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn rejects_unknown_fields_by_name() {
        let err = decode::<Payload>(&limits(), json_request(r#"{"name": "a", "bogus": 1}"#))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("bogus"), "{err}");
    }

    #[tokio::test]
    async fn rejects_concatenated_values() {
        let err = decode::<Payload>(&limits(), json_request(r#"{"name": "a"}{"name": "b"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("single JSON value"), "{err}");
    }

    #[tokio::test]
    async fn rejects_empty_body() {
        let err = decode::<Payload>(&limits(), json_request("")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let big = format!(r#"{{"name": "{}"}}"#, "x".repeat(128));
        let err = decode::<Payload>(&limits(), json_request(&big)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn times_out_on_stalled_body() {
        let tight = DecodeLimits {
            max_bytes: 64,
            deadline: Some(Duration::from_millis(20)),
        };
        let req = HttpRequest::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(futures::stream::pending::<
                Result<Bytes, std::io::Error>,
            >()))
            .unwrap();
        let err = decode::<Payload>(&tight, req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);
    }
}
