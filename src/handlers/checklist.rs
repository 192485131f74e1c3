// src/handlers/checklist.rs
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::token::LinkSigner;
use crate::validators;

/// Items offered when the visitor has not ticked anything on the page.
const DEFAULT_ITEMS: &[&str] = &[
    "backpack-45l",
    "rain-shell",
    "fleece-midlayer",
    "hiking-boots",
    "headlamp",
    "water-bottles-2l",
    "first-aid-kit",
    "sun-protection",
    "trail-snacks",
    "map-and-compass",
];

#[derive(Clone)]
pub struct ChecklistState {
    pub signer: LinkSigner,
}

#[derive(Deserialize)]
pub struct ChecklistQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub items: Option<String>,
}

pub fn router(state: ChecklistState) -> Router {
    Router::new()
        .route("/gear-checklist", get(get_checklist))
        .route("/gear-checklist/download", get(download_checklist))
        .with_state(state)
}

/// GET /gear-checklist?token=...
///
/// The page is link-only: a missing or invalid token answers exactly like
/// a page that does not exist, so probing cannot tell a bad token from a
/// bad URL.
pub async fn get_checklist(
    State(st): State<ChecklistState>,
    Query(q): Query<ChecklistQuery>,
) -> Response {
    let Some(token) = q.token else {
        return not_found();
    };
    let payload = match st.signer.verify(&token) {
        Ok(p) => p,
        Err(reason) => {
            debug!(?reason, "checklist link rejected");
            return not_found();
        }
    };

    let name = display_name(&payload).unwrap_or_else(|| "there".to_string());
    let page = include_str!("../../templates/checklist.html").replace("{{name}}", &name);
    (StatusCode::OK, no_index_headers(), Html(page)).into_response()
}

/// GET /gear-checklist/download?items=a,b,c
///
/// The download link on the checklist page carries no token of its own;
/// the browser's Referer still holds the page URL, token included, and
/// that is what gets verified. `items` goes straight into content
/// generation and is not security-relevant.
pub async fn download_checklist(
    State(st): State<ChecklistState>,
    headers: HeaderMap,
    Query(q): Query<DownloadQuery>,
) -> Response {
    let Some(token) = token_from_referer(&headers) else {
        return not_found();
    };
    if let Err(reason) = st.signer.verify(&token) {
        debug!(?reason, "checklist download rejected");
        return not_found();
    }

    let body = render_packing_list(q.items.as_deref().unwrap_or(""));
    let mut headers = no_index_headers();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"gear-checklist.txt\""),
    );
    (StatusCode::OK, headers, body).into_response()
}

/// One response shape for every deny cause.
fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

fn no_index_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-robots-tag"),
        HeaderValue::from_static("noindex, nofollow"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers
}

/// Best-effort greeting: pick an email-shaped segment out of the payload
/// and use its local part. Never affects the allow/deny decision.
fn display_name(payload: &str) -> Option<String> {
    let email = payload.split(':').find(|seg| validators::valid_email(seg))?;
    let local = email.split('@').next()?;
    // the name lands in markup; only take it when it is plain
    if local.is_empty() || !local.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)) {
        return None;
    }
    Some(local.to_string())
}

fn token_from_referer(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let (_, query) = referer.split_once('?')?;
    query
        .split('&')
        .find_map(|kv| kv.strip_prefix("token="))
        .map(|t| t.to_string())
}

fn render_packing_list(selection: &str) -> String {
    let picked: Vec<&str> = selection
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let items = if picked.is_empty() {
        DEFAULT_ITEMS
    } else {
        &picked[..]
    };

    let mut out = String::from("Ridgeline Guiding — gear checklist\n\n");
    for item in items {
        out.push_str("[ ] ");
        out.push_str(&item.replace('-', " "));
        out.push('\n');
    }
    out
}
