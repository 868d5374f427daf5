//! The structured, transport-agnostic result of dispatch.

use std::path::{Path, PathBuf};

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::cookie::{CookieError, SetCookie};

/// Error type for building and serializing outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("file does not exist at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to serialize body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid status code {0}")]
    InvalidStatus(u16),

    #[error(transparent)]
    Cookie(#[from] CookieError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),
}

/// A file on disk to stream as the response body.
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
    size: u64,
}

impl OutputFile {
    /// Reference a regular file, checking it exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let path = path.as_ref().to_path_buf();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OutputError::FileNotFound(path));
            }
            Err(e) => return Err(OutputError::Io(e)),
        };
        if !metadata.is_file() {
            return Err(OutputError::NotAFile(path));
        }

        Ok(Self {
            path,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size recorded when the file was referenced.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Response body variants.
#[derive(Debug, Clone)]
pub enum Body {
    Text(String),
    /// Serialized as JSON by the response serializer.
    Json(Value),
    File(OutputFile),
    /// An error value; becomes a 500 unless a status is set.
    Error(String),
}

/// What a handler returns.
///
/// `Output::default()` carries neither status nor body and is rendered as a
/// 404 by the serializer.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub status: Option<u16>,
    pub body: Option<Body>,
    pub headers: HeaderMap,
    /// Cookies to set, one `Set-Cookie` header each, in order.
    pub cookies: Vec<(String, SetCookie)>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Some(Body::Text(body.into())),
            ..Self::default()
        }
    }

    pub fn json(body: Value) -> Self {
        Self {
            body: Some(Body::Json(body)),
            ..Self::default()
        }
    }

    /// Serialize any value into a JSON body.
    pub fn to_json<T: Serialize>(body: &T) -> Result<Self, OutputError> {
        Ok(Self::json(serde_json::to_value(body)?))
    }

    pub fn file(file: OutputFile) -> Self {
        Self {
            body: Some(Body::File(file)),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            body: Some(Body::Error(message.into())),
            ..Self::default()
        }
    }

    /// Error output carrying the error's top-level message.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::error(err.to_string())
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, cookie: impl Into<SetCookie>) -> Self {
        self.cookies.push((name.into(), cookie.into()));
        self
    }

    /// The body text, for text and error bodies.
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            Some(Body::Text(text)) | Some(Body::Error(text)) => Some(text),
            _ => None,
        }
    }

    /// True if neither status nor body is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.body.is_none()
    }
}

impl From<&str> for Output {
    fn from(body: &str) -> Self {
        Output::text(body)
    }
}

impl From<String> for Output {
    fn from(body: String) -> Self {
        Output::text(body)
    }
}

impl From<Value> for Output {
    fn from(body: Value) -> Self {
        Output::json(body)
    }
}
