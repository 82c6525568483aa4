//! Proxy handlers forwarding to the headless CMS
//!
//! Two endpoints back the form pipeline of the content site:
//! - `GET /api/auth/csrf` fetches a session CSRF token from the CMS,
//! - `POST /api/webform/submit/...` relays form submissions verbatim,
//!   tagged with `x-form-processed` so the CMS skips its own page handling.
//!
//! Only form content types are forwarded; everything else is rejected
//! rather than silently passed through.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

const DEFAULT_SUBMIT_ERROR: &str = "Error submitting to CMS.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfResponse {
    csrf_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            status_code: status.as_u16(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Fetch a CSRF token from the CMS session endpoint.
pub async fn csrf_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(cms) = state.cms_base() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CMS API base URL is not configured",
        );
    };

    let token = match state
        .client
        .get(format!("{}/session/token", cms))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
        _ => None,
    };

    match token {
        Some(csrf_token) => Json(CsrfResponse { csrf_token }).into_response(),
        None => error_response(StatusCode::BAD_GATEWAY, "Failed to fetch CSRF token"),
    }
}

/// Relay a form submission to the CMS, preserving the original path and
/// query so webform ids survive the hop.
pub async fn webform_handler(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(cms) = state.cms_base() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CMS API base URL is not configured",
        );
    };

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !is_form_content_type(content_type) {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Form data expected but not found.",
        );
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/api/webform/submit");
    let target = format!("{}{}", cms, path_and_query);

    let request = state
        .client
        .post(&target)
        .header(CONTENT_TYPE, content_type)
        .header("x-form-processed", "true")
        .body(body.to_vec());

    match request.send().await {
        Ok(resp) => relay_response(resp).await,
        Err(e) => {
            eprintln!("[proxy] Webform submit to {} failed: {}", target, e);
            let status = normalize_status(e.status().map(|s| s.as_u16()));
            let message = e.to_string();
            error_response(status, normalize_message(Some(&message)))
        }
    }
}

/// Map the upstream response back to the client, headers and all.
async fn relay_response(resp: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(resp.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = Response::builder().status(status);

    for (name, value) in resp.headers() {
        if let Ok(name) = axum::http::HeaderName::from_bytes(name.as_str().as_bytes()) {
            if let Ok(value) = axum::http::HeaderValue::from_bytes(value.as_bytes()) {
                builder = builder.header(name, value);
            }
        }
    }

    let body = resp.bytes().await.unwrap_or_default();
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Only actual form encodings are proxied
fn is_form_content_type(content_type: &str) -> bool {
    content_type.contains("multipart/form-data")
        || content_type.contains("application/x-www-form-urlencoded")
}

/// Upstream error statuses outside the valid range collapse to 500
fn normalize_status(code: Option<u16>) -> StatusCode {
    code.and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Blank upstream messages collapse to a generic one
fn normalize_message(message: Option<&str>) -> &str {
    match message {
        Some(m) if !m.trim().is_empty() => m,
        _ => DEFAULT_SUBMIT_ERROR,
    }
}
