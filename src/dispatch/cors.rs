//! CORS preflight answers and response header injection.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue};

use crate::http::Output;

/// Status for an answered preflight.
pub const PREFLIGHT_STATUS: u16 = 204;

/// The permissive headers: origin, headers and methods all `*`.
pub fn wildcard_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    fill_missing(&mut headers);
    headers
}

/// `204` answer to an `OPTIONS` preflight.
pub fn preflight() -> Output {
    Output {
        status: Some(PREFLIGHT_STATUS),
        headers: wildcard_headers(),
        ..Output::default()
    }
}

/// Final header pass over a dispatch result. With `cors` set, each
/// `Access-Control-Allow-*` header the handlers left unset becomes `*`.
pub fn post_route(mut output: Output, cors: bool) -> Output {
    if cors {
        fill_missing(&mut output.headers);
    }
    output
}

fn fill_missing(headers: &mut HeaderMap) {
    for name in [
        ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS,
    ] {
        headers
            .entry(name)
            .or_insert_with(|| HeaderValue::from_static("*"));
    }
}
