//! Request parsing into an `Input`.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Split the URI into path and parsed query
//! - Parse the `Cookie` header
//! - Read the body up to the configured limit and fill `fields`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `Content-Length` checked before the body is read
//! - Urlencoded, JSON-object and multipart bodies become fields; anything
//!   else is left for handlers to ignore
//! - Multipart parts with a filename become `files`, the rest are fields

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use futures_util::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::http::cookie::parse_cookie_header;
use crate::http::input::{Input, Query, UploadedFile};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Error type for request parsing.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON body must be an object")]
    NotAnObject,

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
}

impl RequestError {
    /// Status the server answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Read(_)
            | RequestError::Json(_)
            | RequestError::NotAnObject
            | RequestError::Multipart(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// UUID v4 request IDs for `tower_http`'s request-id layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the `Input` for a request, reading at most `max_body_bytes`.
pub async fn prepare_input(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<Input, RequestError> {
    let (parts, body) = request.into_parts();

    let mut input = Input::new(parts.method, parts.uri.path());
    input.query = parts.uri.query().map(Query::parse).unwrap_or_default();
    input.cookies = parse_cookies(&parts.headers);

    if declared_length(&parts.headers).is_some_and(|length| length > max_body_bytes) {
        return Err(RequestError::TooLarge {
            limit: max_body_bytes,
        });
    }

    let bytes = read_body(body, max_body_bytes).await?;
    if !bytes.is_empty() {
        parse_body(&parts.headers, bytes, &mut input).await?;
    }

    input.headers = parts.headers;
    input.extensions = parts.extensions;
    Ok(input)
}

/// The request ID of an input, if the request-id layer assigned one.
pub fn request_id(input: &Input) -> Option<&str> {
    input.header(X_REQUEST_ID)
}

fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for (name, value) in parse_cookie_header(value) {
            cookies.entry(name).or_insert(value);
        }
    }
    cookies
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, RequestError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RequestError::Read)?;
        if buffer.len() + chunk.len() > limit {
            return Err(RequestError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}

async fn parse_body(headers: &HeaderMap, bytes: Bytes, input: &mut Input) -> Result<(), RequestError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence == "application/x-www-form-urlencoded" {
        let text = String::from_utf8_lossy(&bytes);
        input.fields = Query::parse(&text).into_json();
    } else if essence == "application/json" || essence.ends_with("+json") {
        input.fields = match serde_json::from_slice(&bytes)? {
            Value::Object(fields) => fields,
            _ => return Err(RequestError::NotAnObject),
        };
    } else if essence == "multipart/form-data" {
        parse_multipart(content_type, bytes, input).await?;
    }

    Ok(())
}

async fn parse_multipart(
    content_type: &str,
    bytes: Bytes,
    input: &mut Input,
) -> Result<(), RequestError> {
    let boundary = multer::parse_boundary(content_type)?;
    let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(original_filename) => {
                let content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await?;
                input.files.entry(name).or_default().push(UploadedFile {
                    original_filename: Some(original_filename),
                    content_type,
                    data,
                });
            }
            None => {
                let value = Value::String(field.text().await?);
                match input.fields.get_mut(&name) {
                    Some(Value::Array(values)) => values.push(value),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, value]);
                    }
                    None => {
                        input.fields.insert(name, value);
                    }
                }
            }
        }
    }

    Ok(())
}
