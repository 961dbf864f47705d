//! Request interception.
//!
//! [`EmailGate::intercept`] is the framework-independent core; the axum
//! middleware [`email_gate_middleware`] maps its result onto responses.
//!
//! # Flow
//!
//! ```text
//! method/path guard ──no──► pass through
//!        │
//! resolve API key ──missing──► Err (500 in middleware)
//!        │
//! recognised body? ──no──► pass through (body untouched)
//!        │
//! buffer ──over limit / read error──► pass through (bytes replayed)
//!        │
//! extract field ──absent──► pass through (same bytes)
//!        │
//! verify + decide ──deny──► 422 JSON
//!        │          ──401──► Err (500 in middleware)
//!        │          ──remote error──► pass through
//!        ▼
//!   pass through
//! ```

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use http_body_util::BodyExt;

use crate::config::GateConfig;
use crate::error::Error;
use crate::logging::MaskedEmail;
use crate::pipeline::{FailureMode, Outcome, Pipeline};
use crate::policy::{Decision, DenyPayload};
use crate::verifier::Verifier;

use super::extract::{extract_from_bytes, BodyKind};

/// What [`EmailGate::intercept`] decided for one request.
#[derive(Debug)]
pub enum Interception {
    /// Forward this request downstream. It carries the original parts and body bytes.
    PassThrough(Request),
    /// Reject with 422 and this payload.
    Deny(DenyPayload),
}

/// Form-submission guard for HTTP services.
///
/// Clone it into router state; clones share configuration and the HTTP client.
///
/// # Examples
///
/// ```no_run
/// use axum::{middleware, routing::post, Router};
/// use email_gate::web::{email_gate_middleware, EmailGate};
/// use email_gate::GateConfig;
///
/// let config = GateConfig::builder().path("/signup").build().unwrap();
/// let gate = EmailGate::new(config);
///
/// let app: Router = Router::new()
///     .route("/signup", post(|| async { "welcome" }))
///     .layer(middleware::from_fn_with_state(gate, email_gate_middleware));
/// ```
#[derive(Debug, Clone)]
pub struct EmailGate {
    pipeline: Pipeline,
}

impl EmailGate {
    /// Creates a gate that talks to the configured service.
    pub fn new(config: GateConfig) -> Self {
        Self {
            pipeline: Pipeline::new(config),
        }
    }

    /// Creates a gate with a custom verifier.
    pub fn with_verifier(config: GateConfig, verifier: impl Verifier + 'static) -> Self {
        Self {
            pipeline: Pipeline::with_verifier(config, verifier),
        }
    }

    /// The frozen configuration.
    pub fn config(&self) -> &GateConfig {
        self.pipeline.config()
    }

    /// Inspects one request.
    ///
    /// The request is never modified: a pass-through carries the same parts
    /// and the same body bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MissingCredential`] (checked before the body is read) and
    /// [`Error::AuthenticationFailure`]. Remote failures pass the request through.
    pub async fn intercept(&self, request: Request) -> Result<Interception, Error> {
        let config = self.pipeline.config();

        if !config.guards(request.method(), request.uri().path()) {
            return Ok(Interception::PassThrough(request));
        }

        let key = self.pipeline.resolve_key()?;

        let Some(kind) = BodyKind::of(request.headers()) else {
            tracing::trace!(path = %request.uri().path(), "no recognised form body, skipping");
            return Ok(Interception::PassThrough(request));
        };

        if declared_length(request.headers()).is_some_and(|len| len > config.max_body_bytes() as u64)
        {
            tracing::debug!(
                path = %request.uri().path(),
                limit = config.max_body_bytes(),
                "declared body exceeds limit, skipping"
            );
            return Ok(Interception::PassThrough(request));
        }

        let (parts, body) = request.into_parts();
        let bytes = match buffer(body, config.max_body_bytes()).await {
            Buffered::Complete(bytes) => bytes,
            Buffered::Unread(body) => {
                tracing::debug!(
                    path = %parts.uri.path(),
                    limit = config.max_body_bytes(),
                    "body not fully buffered, skipping"
                );
                return Ok(Interception::PassThrough(Request::from_parts(parts, body)));
            }
        };

        let email = extract_from_bytes(
            kind,
            parts.headers.get(CONTENT_TYPE),
            bytes.clone(),
            config.field(),
        )
        .await;
        let request = Request::from_parts(parts, Body::from(bytes));

        let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
            tracing::debug!(field = config.field(), "field absent, skipping");
            return Ok(Interception::PassThrough(request));
        };

        match self
            .pipeline
            .run_with_key(&email, &key, FailureMode::FailOpen)
            .await?
        {
            Outcome::Decided {
                decision: Decision::Deny(payload),
                ..
            } => {
                tracing::info!(
                    path = %request.uri().path(),
                    email = %MaskedEmail(&email),
                    state = %payload.details.state,
                    "rejecting submission"
                );
                Ok(Interception::Deny(payload))
            }
            Outcome::Decided { .. } | Outcome::Tolerated(_) => {
                Ok(Interception::PassThrough(request))
            }
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

enum Buffered {
    Complete(Bytes),
    /// The limit was crossed or the stream failed; carries a body that
    /// replays what was read, then the rest of the original stream.
    Unread(Body),
}

async fn buffer(mut body: Body, limit: usize) -> Buffered {
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0;

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                // Trailers carry no form data.
                let Ok(data) = frame.into_data() else { continue };
                total += data.len();
                chunks.push(data);
                if total > limit {
                    return Buffered::Unread(replay(chunks, Ok(body)));
                }
            }
            Err(err) => return Buffered::Unread(replay(chunks, Err(err))),
        }
    }

    Buffered::Complete(Bytes::from(chunks.concat()))
}

fn replay(read: Vec<Bytes>, rest: Result<Body, axum::Error>) -> Body {
    let head = futures::stream::iter(read.into_iter().map(Ok::<_, axum::Error>));
    match rest {
        Ok(body) => Body::from_stream(head.chain(body.into_data_stream())),
        Err(err) => Body::from_stream(head.chain(futures::stream::once(async move { Err(err) }))),
    }
}

/// axum middleware running [`EmailGate::intercept`].
///
/// Install with `axum::middleware::from_fn_with_state(gate, email_gate_middleware)`.
/// Denials become 422 JSON responses; missing or rejected credentials become 500
/// (already logged by the pipeline).
pub async fn email_gate_middleware(
    State(gate): State<EmailGate>,
    request: Request,
    next: Next,
) -> Response {
    match gate.intercept(request).await {
        Ok(Interception::PassThrough(request)) => next.run(request).await,
        Ok(Interception::Deny(payload)) => payload.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::Method;
    use axum::middleware::from_fn_with_state;
    use axum::routing::post;
    use axum::Router;

    use crate::classification::{EmailState, SubState};
    use crate::error::RemoteError;
    use crate::testing::{LogCapture, StubVerifier};

    fn config() -> GateConfig {
        GateConfig::builder()
            .api_key("sk-test")
            .path("/signup")
            .build()
            .unwrap()
    }

    fn form(path: &str, body: &'static str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(request: Request) -> String {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn denies_rejected_state() {
        let gate = EmailGate::with_verifier(
            config(),
            StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox),
        );

        match gate.intercept(form("/signup", "email=bad%40bad.com")).await.unwrap() {
            Interception::Deny(payload) => {
                assert_eq!(payload.details.state, EmailState::Invalid);
                assert_eq!(payload.details.sub_state, SubState::FailedNoMailbox);
            }
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn passes_allowed_state_with_body_intact() {
        let gate = EmailGate::with_verifier(config(), StubVerifier::classify(EmailState::Ok, SubState::Ok));

        match gate.intercept(form("/signup", "email=ok%40ok.com&n=1")).await.unwrap() {
            Interception::PassThrough(request) => {
                assert_eq!(request.uri().path(), "/signup");
                assert_eq!(body_text(request).await, "email=ok%40ok.com&n=1");
            }
            other => panic!("expected pass-through, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unguarded_requests_skip_everything() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let config = GateConfig::builder()
            .api_key_env("EMAIL_GATE_TEST_MIDDLEWARE_UNSET")
            .path("/signup")
            .build()
            .unwrap();
        let gate = EmailGate::with_verifier(config, stub.clone());

        // Wrong path: not even the credential is resolved.
        let outcome = gate.intercept(form("/login", "email=bad%40bad.com")).await.unwrap();
        assert!(matches!(outcome, Interception::PassThrough(_)));

        let get = Request::builder()
            .method(Method::GET)
            .uri("/signup")
            .body(Body::empty())
            .unwrap();
        let outcome = gate.intercept(get).await.unwrap();
        assert!(matches!(outcome, Interception::PassThrough(_)));

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn absent_field_passes_without_verification() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let gate = EmailGate::with_verifier(config(), stub.clone());

        for body in ["name=someone", "email=", "email=%20%20"] {
            let outcome = gate.intercept(form("/signup", body)).await.unwrap();
            assert!(matches!(outcome, Interception::PassThrough(_)), "body: {body}");
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn unrecognised_content_type_is_not_buffered() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let gate = EmailGate::with_verifier(config(), stub.clone());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("email=bad@bad.com"))
            .unwrap();

        match gate.intercept(request).await.unwrap() {
            Interception::PassThrough(request) => {
                assert_eq!(body_text(request).await, "email=bad@bad.com");
            }
            other => panic!("expected pass-through, got {:?}", other),
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn remote_failure_fails_open() {
        let gate = EmailGate::with_verifier(config(), StubVerifier::fail(RemoteError::Timeout.into()));

        let outcome = gate.intercept(form("/signup", "email=bad%40bad.com")).await.unwrap();
        assert!(matches!(outcome, Interception::PassThrough(_)));
    }

    #[tokio::test]
    async fn authentication_failure_propagates() {
        let gate = EmailGate::with_verifier(config(), StubVerifier::fail(Error::AuthenticationFailure));

        let err = gate
            .intercept(form("/signup", "email=bad%40bad.com"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::AuthenticationFailure);
    }

    #[tokio::test]
    async fn missing_credential_is_raised_before_body_is_read() {
        let stub = StubVerifier::classify(EmailState::Ok, SubState::Ok);
        let config = GateConfig::builder()
            .api_key_env("EMAIL_GATE_TEST_MIDDLEWARE_MISSING")
            .build()
            .unwrap();
        let gate = EmailGate::with_verifier(config, stub.clone());

        let err = gate
            .intercept(form("/signup", "email=a%40b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_declared_body_passes_through() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let config = GateConfig::builder()
            .api_key("sk-test")
            .max_body_bytes(8)
            .build()
            .unwrap();
        let gate = EmailGate::with_verifier(config, stub.clone());

        let body = "email=bad%40bad.com";
        let request = Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let outcome = gate.intercept(request).await.unwrap();
        assert!(matches!(outcome, Interception::PassThrough(_)));
        assert_eq!(stub.calls(), 0);
    }

    fn streamed(chunks: Vec<Result<&'static str, std::io::Error>>) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap()
    }

    #[tokio::test]
    async fn streamed_body_over_limit_passes_through_intact() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let config = GateConfig::builder()
            .api_key("sk-test")
            .max_body_bytes(16)
            .build()
            .unwrap();
        let gate = EmailGate::with_verifier(config, stub.clone());

        let request = streamed(vec![Ok("email=ok%40ok.com"), Ok("&padding=xxxxxxxxxxxx")]);

        match gate.intercept(request).await.unwrap() {
            Interception::PassThrough(request) => {
                assert_eq!(
                    body_text(request).await,
                    "email=ok%40ok.com&padding=xxxxxxxxxxxx"
                );
            }
            other => panic!("expected pass-through, got {:?}", other),
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn interrupted_body_passes_through_with_its_error() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let gate = EmailGate::with_verifier(config(), stub.clone());

        let request = streamed(vec![
            Ok("email=bad%40bad"),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ]);

        match gate.intercept(request).await.unwrap() {
            Interception::PassThrough(request) => {
                assert!(axum::body::to_bytes(request.into_body(), usize::MAX)
                    .await
                    .is_err());
            }
            other => panic!("expected pass-through, got {:?}", other),
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn form_larger_than_axum_default_limit_is_checked() {
        let stub = StubVerifier::classify(EmailState::Invalid, SubState::FailedNoMailbox);
        let config = GateConfig::builder()
            .api_key("sk-test")
            .max_body_bytes(8 * 1024 * 1024)
            .build()
            .unwrap();
        let gate = EmailGate::with_verifier(config, stub.clone());

        let body = format!("email=bad%40bad.com&notes={}", "x".repeat(3 * 1024 * 1024));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let outcome = gate.intercept(request).await.unwrap();
        assert!(matches!(outcome, Interception::Deny(_)));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn fatal_error_is_logged_once() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let gate = EmailGate::with_verifier(config(), StubVerifier::fail(Error::AuthenticationFailure));
        let app = Router::new()
            .route("/signup", post(|| async { "welcome" }))
            .layer(from_fn_with_state(gate, email_gate_middleware));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/signup"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("email=a%40b.com")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(logs.lines_at("ERROR"), 1);
    }

    #[tokio::test]
    async fn slow_verifier_still_decides() {
        let gate = EmailGate::with_verifier(
            config(),
            StubVerifier::classify(EmailState::Invalid, SubState::FailedSpamTrap)
                .delayed(Duration::from_millis(20)),
        );

        let outcome = gate.intercept(form("/signup", "email=t%40trap.com")).await.unwrap();
        assert!(matches!(outcome, Interception::Deny(_)));
    }
}
