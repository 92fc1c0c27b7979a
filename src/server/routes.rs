use serde::Serialize;

use crate::ledger::LedgerError;
use crate::persistence::DocumentError;
use crate::server::api::{self, ApiError, AppState, InsufficientFundsDetails};

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn to_http_string(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_code,
            self.status_text,
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<InsufficientFundsDetails>,
}

/// Route one request. `target` is the request path, optionally with a query string.
pub fn route_request(state: &mut AppState, method: &str, target: &str, body: &str) -> HttpResponse {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    match (method, path.trim_end_matches('/')) {
        ("GET", "/api/health") => respond(api::health_payload(state)),
        ("GET", "/api/catalog") => respond(api::catalog_payload(state)),
        ("PUT", "/api/catalog") => respond(api::replace_catalog_payload(state, body)),
        ("POST", "/api/sessions") => respond(api::create_session_payload(state)),
        (method, path) if path.starts_with("/api/sessions/") => {
            let rest = path.trim_start_matches("/api/sessions/");
            let (id, action) = rest.split_once('/').unwrap_or((rest, ""));
            route_session(state, method, id, action, query, body)
        }
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

fn route_session(
    state: &mut AppState,
    method: &str,
    id: &str,
    action: &str,
    query: &str,
    body: &str,
) -> HttpResponse {
    let result = match (method, action) {
        ("GET", "") => api::session_view_payload(state, id, query),
        ("POST", "buy") => api::buy_payload(state, id, body),
        ("POST", "sell") => api::sell_payload(state, id, body),
        ("POST", "level") => api::level_payload(state, id, body),
        ("POST", "max") => api::max_payload(state, id, body),
        ("POST", "reset") => api::reset_payload(state, id),
        ("POST", "import") => api::import_payload(state, id, body),
        ("PUT", "currency") => api::currency_payload(state, id, body),
        ("PUT", "strategy") => api::strategy_payload(state, id, body),
        ("GET", "recommendation") => api::recommendation_payload(state, id, query),
        ("POST", "recommendation/buy") => api::buy_recommended_payload(state, id, body),
        ("POST", "recommendation/ignore") => api::ignore_recommended_payload(state, id, body),
        ("GET", "export") => api::export_payload(state, id),
        _ => return error_response(404, "Not Found", "Route not found"),
    };
    respond(result)
}

fn respond(result: Result<String, ApiError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse {
            status_code: 200,
            status_text: "OK",
            content_type: "application/json",
            body: payload,
        },
        Err(err) => api_error_response(&err),
    }
}

fn api_error_response(err: &ApiError) -> HttpResponse {
    let (status_code, status_text) = match err {
        ApiError::Parse(_) | ApiError::Validation(_) | ApiError::Catalog(_) => {
            (400, "Bad Request")
        }
        ApiError::SessionLimit(_) => (503, "Service Unavailable"),
        ApiError::Document(DocumentError::Serialize(_)) => (500, "Internal Server Error"),
        ApiError::Document(_) => (400, "Bad Request"),
        ApiError::SessionNotFound | ApiError::Ledger(LedgerError::UnknownUpgrade(_)) => {
            (404, "Not Found")
        }
        ApiError::Ledger(LedgerError::InsufficientFunds { .. }) => (409, "Conflict"),
        ApiError::Store(_) | ApiError::Serialize(_) => (500, "Internal Server Error"),
    };

    let details = match err {
        ApiError::Ledger(LedgerError::InsufficientFunds {
            upgrade,
            required,
            available,
            level,
        }) => Some(InsufficientFundsDetails {
            upgrade: upgrade.clone(),
            required: *required,
            available: *available,
            level: *level,
        }),
        _ => None,
    };

    let message = err.to_string();
    json_error(status_code, status_text, &message, details)
}

fn json_error(
    status_code: u16,
    status_text: &'static str,
    message: &str,
    details: Option<InsufficientFundsDetails>,
) -> HttpResponse {
    let fallback = "{\n  \"status\": \"error\",\n  \"message\": \"Unknown error\"\n}".to_string();
    let payload = ErrorBody {
        status: "error",
        message,
        details,
    };

    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: serde_json::to_string_pretty(&payload).unwrap_or(fallback),
    }
}

fn error_response(status_code: u16, status_text: &'static str, message: &str) -> HttpResponse {
    json_error(status_code, status_text, message, None)
}
