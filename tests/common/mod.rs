//! Local stand-in for the classification service.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

/// How the stub service answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with one result record.
    Classify {
        state: &'static str,
        sub_state: &'static str,
        suggestion: Option<&'static str>,
    },
    /// Bare status code with an empty body.
    Status(u16),
    /// 200 with a body that is not JSON.
    Garbage,
    /// Wait, then answer `ok`.
    Hang(Duration),
}

/// What the stub saw for one call.
#[derive(Debug, Clone)]
pub struct Seen {
    pub authorization: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
struct StubState {
    reply: Reply,
    seen: Arc<Mutex<Vec<Seen>>>,
}

/// A running stub service.
pub struct StubService {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl StubService {
    pub async fn start(reply: Reply) -> Self {
        init_tracing();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            reply,
            seen: seen.clone(),
        };
        let router = Router::new()
            .route("/api/v1/verify_inline", post(verify_inline))
            .with_state(state);

        Self {
            base_url: serve(router).await,
            seen,
        }
    }

    pub fn calls(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn verify_inline(
    State(stub): State<StubState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    stub.seen.lock().unwrap().push(Seen {
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        email: query.get("email").cloned(),
    });
    let address = query.get("email").cloned().unwrap_or_default();

    match stub.reply {
        Reply::Classify {
            state,
            sub_state,
            suggestion,
        } => Json(record(&address, state, sub_state, suggestion)).into_response(),
        Reply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        Reply::Garbage => (StatusCode::OK, "<html>gateway</html>").into_response(),
        Reply::Hang(delay) => {
            tokio::time::sleep(delay).await;
            Json(record(&address, "ok", "email_ok", None)).into_response()
        }
    }
}

fn record(
    address: &str,
    state: &str,
    sub_state: &str,
    suggestion: Option<&str>,
) -> serde_json::Value {
    json!({
        "emails": [{
            "address": address,
            "domain": address.rsplit_once('@').map(|(_, d)| d),
            "canonical": address.split_once('@').map(|(l, _)| l),
            "mx_record": null,
            "email_state": state,
            "email_sub_state": sub_state,
            "did_you_mean": suggestion,
            "verified_at": "2024-05-01T12:00:00.000Z"
        }]
    })
}

/// Routes library logs to the test harness; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
