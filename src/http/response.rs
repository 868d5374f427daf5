//! Output serialization.
//!
//! # Responsibilities
//! - Default the status (404 for nothing, 500 for errors, 200 otherwise)
//! - Infer `content-type` and `content-length` when the handler left them unset
//! - Stream file bodies from disk
//! - Emit one `Set-Cookie` header per cookie
//!
//! # Design Decisions
//! - Caller-set headers always win over inferred ones
//! - A malformed output (bad status, bad cookie) is answered with a 500
//!   naming the problem rather than failing the connection

use axum::body::Body as HttpBody;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::io::ReaderStream;

use crate::http::output::{Body, Output, OutputError};

const NOT_FOUND: &str = "Not Found";
const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

static HTML_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<[a-z].*>").ok());

/// Render an `Output` as an HTTP response.
pub async fn send_output(output: Output) -> Response {
    match render(output).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "Invalid output");
            let message = err.to_string();
            let mut headers = HeaderMap::new();
            infer_text_headers(&mut headers, &message);
            finish(StatusCode::INTERNAL_SERVER_ERROR, headers, HttpBody::from(message))
        }
    }
}

async fn render(output: Output) -> Result<Response, OutputError> {
    let Output {
        status,
        body,
        mut headers,
        cookies,
    } = output;

    for (name, cookie) in &cookies {
        let value = HeaderValue::from_str(&cookie.encode(name)?)?;
        headers.append(SET_COOKIE, value);
    }

    let (code, body) = match (status, body) {
        (None, None) => (404, Some(Body::Text(NOT_FOUND.to_string()))),
        (status, Some(Body::Error(message))) if message.is_empty() => (
            status.unwrap_or(500),
            Some(Body::Text(INTERNAL_SERVER_ERROR.to_string())),
        ),
        (status, Some(Body::Error(message))) => (status.unwrap_or(500), Some(Body::Text(message))),
        (status, body) => (status.unwrap_or(200), body),
    };
    let status = StatusCode::from_u16(code).map_err(|_| OutputError::InvalidStatus(code))?;

    let body = match body {
        None => HttpBody::empty(),
        Some(Body::Text(text)) | Some(Body::Error(text)) => {
            infer_text_headers(&mut headers, &text);
            HttpBody::from(text)
        }
        Some(Body::Json(value)) => {
            let text = serde_json::to_string(&value)?;
            set_if_absent(&mut headers, CONTENT_TYPE, HeaderValue::from_static("application/json"));
            set_if_absent(&mut headers, CONTENT_LENGTH, HeaderValue::from(text.len()));
            HttpBody::from(text)
        }
        Some(Body::File(file)) => {
            let mime = mime_guess::from_path(file.path()).first_or_octet_stream();
            set_if_absent(&mut headers, CONTENT_TYPE, HeaderValue::from_str(mime.as_ref())?);
            set_if_absent(&mut headers, CONTENT_LENGTH, HeaderValue::from(file.size()));
            let handle = tokio::fs::File::open(file.path()).await?;
            HttpBody::from_stream(ReaderStream::new(handle))
        }
    };

    Ok(finish(status, headers, body))
}

fn infer_text_headers(headers: &mut HeaderMap, text: &str) {
    let content_type = if looks_like_html(text) {
        "text/html"
    } else {
        "text/plain"
    };
    set_if_absent(headers, CONTENT_TYPE, HeaderValue::from_static(content_type));
    set_if_absent(headers, CONTENT_LENGTH, HeaderValue::from(text.len()));
}

fn set_if_absent(headers: &mut HeaderMap, name: axum::http::HeaderName, value: HeaderValue) {
    headers.entry(name).or_insert(value);
}

fn finish(status: StatusCode, headers: HeaderMap, body: HttpBody) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// True if `text` has a `<` followed by a letter and, somewhere later, a `>`.
pub fn looks_like_html(text: &str) -> bool {
    HTML_TAG.as_ref().is_some_and(|re| re.is_match(text))
}
