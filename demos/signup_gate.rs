//! Signup form guarded by the email gate.
//!
//! Serves `POST /signup` on 127.0.0.1:3000 behind `email_gate_middleware`.
//! Addresses classified `invalid` or `risky` are rejected with 422; everything
//! else reaches the handler.
//!
//! Run with: `TRUELIST_API_KEY=... cargo run --example signup_gate`
//!
//! Then:
//!
//! ```text
//! curl -i -d 'email=someone@example.com' http://127.0.0.1:3000/signup
//! ```

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Form, Router};
use email_gate::web::{email_gate_middleware, EmailGate};
use email_gate::{EmailState, GateConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Signup {
    email: String,
}

async fn signup(Form(form): Form<Signup>) -> String {
    format!("welcome, {}\n", form.email)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = GateConfig::builder()
        .path("/signup")
        .reject(EmailState::Risky)
        .deny_message("Please use a permanent, deliverable address")
        .timeout_ms(3_000)
        .build()?;

    // Fails at request time, not here, when the key is missing.
    let gate = EmailGate::new(config);

    let app = Router::new()
        .route("/signup", post(signup))
        .route("/health", get(|| async { "ok" }))
        .layer(from_fn_with_state(gate, email_gate_middleware));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    println!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
