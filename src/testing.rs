//! Test doubles shared by the unit tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::classification::{Classification, EmailState, SubState};
use crate::credential::ApiKey;
use crate::error::Error;
use crate::verifier::Verifier;

/// Verifier returning a canned answer and counting calls.
#[derive(Clone)]
pub(crate) struct StubVerifier {
    reply: Result<(EmailState, SubState), Error>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubVerifier {
    pub(crate) fn classify(state: EmailState, sub_state: SubState) -> Self {
        Self {
            reply: Ok((state, sub_state)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn fail(error: Error) -> Self {
        Self {
            reply: Err(error),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for StubVerifier {
    async fn verify(&self, email: &str, _key: &ApiKey) -> Result<Classification, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .clone()
            .map(|(state, sub_state)| Classification::new(email, state, sub_state))
    }
}

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's events here until the guard drops.
    pub(crate) fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn lines_at(&self, level: &str) -> usize {
        let output = String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned();
        output
            .lines()
            .filter(|line| line.trim_start().starts_with(level))
            .count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
