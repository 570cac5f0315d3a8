//! Prompt enhancer client and error types.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::assembler::{AssembleError, ParseOptions, Snapshot, StreamAssembler};
use crate::cancel::CancelHandle;
use crate::http::{add_extra_headers, build_http_client};
use crate::model::EnhanceRequest;
use crate::options::{HttpTransport, TransportOptions};

const DEFAULT_API_BASE: &str = "http://localhost:5173";
const ENHANCER_PATH: &str = "/api/enhancer";

/// Errors that can occur while enhancing a prompt.
#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prompt enhancer request failed (HTTP {status}): {body}")]
    Request {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Enhancer cancelled")]
    Cancelled,

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Client for the prompt enhancer endpoint.
///
/// Each [`enhance`](Self::enhance) call POSTs the prompt and assembles the
/// streamed reply. Starting a new enhancement cancels the one in flight.
///
/// # Example
/// ```no_run
/// use streamtext::client::PromptEnhancer;
/// use streamtext::options::{HttpTransport, TransportOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let enhancer = PromptEnhancer::new(TransportOptions::new(
///     HttpTransport::default().with_base_url("http://localhost:5173"),
/// ));
///
/// let improved = enhancer
///     .enhance_with("build a todo app", |fragment| print!("{fragment}"))
///     .await?;
/// println!("\n{improved}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PromptEnhancer {
    transport_options: TransportOptions<HttpTransport>,
    assembler: StreamAssembler,
    in_flight: Mutex<Option<CancelHandle>>,
}

impl PromptEnhancer {
    pub fn new(transport_options: TransportOptions<HttpTransport>) -> Self {
        Self {
            transport_options,
            assembler: StreamAssembler::new(),
            in_flight: Mutex::new(None),
        }
    }

    /// Enhance `prompt` and return the assembled text.
    pub async fn enhance(&self, prompt: &str) -> Result<String, EnhanceError> {
        self.enhance_with_options(prompt, ParseOptions::new()).await
    }

    /// Enhance `prompt`, reporting each fragment as it arrives.
    pub async fn enhance_with(
        &self,
        prompt: &str,
        on_fragment: impl FnMut(&str) + Send,
    ) -> Result<String, EnhanceError> {
        self.enhance_with_options(prompt, ParseOptions::new().on_fragment(on_fragment))
            .await
    }

    /// Enhance `prompt` with explicit parse options.
    ///
    /// Any cancel handle in `options` is replaced by the enhancer's own, so
    /// use [`cancel`](Self::cancel) to stop the request.
    pub async fn enhance_with_options(
        &self,
        prompt: &str,
        options: ParseOptions<'_>,
    ) -> Result<String, EnhanceError> {
        self.cancel();

        let handle = CancelHandle::new();
        *self.lock_in_flight() = Some(handle.clone());
        let in_flight = InFlight {
            enhancer: self,
            handle: &handle,
        };
        self.assembler.reset();

        let result = self.request(prompt, &handle, options).await;
        drop(in_flight);

        match result {
            Err(e) if handle.is_cancelled() => {
                debug!(error = %e, "enhancement cancelled");
                Err(EnhanceError::Cancelled)
            }
            other => other,
        }
    }

    /// Cancel the enhancement in flight, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock_in_flight().take() {
            debug!("cancelling in-flight enhancement");
            handle.cancel();
        }
    }

    /// Cancel any enhancement and clear the assembled state.
    pub fn reset(&self) {
        self.cancel();
        self.assembler.reset();
    }

    /// Whether a request is in flight or its body is still streaming.
    pub fn is_enhancing(&self) -> bool {
        self.lock_in_flight().is_some() || self.assembler.snapshot().streaming
    }

    /// Current assembled state.
    pub fn snapshot(&self) -> Snapshot {
        self.assembler.snapshot()
    }

    /// Subscribe to assembled state changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.assembler.subscribe()
    }

    async fn request(
        &self,
        prompt: &str,
        handle: &CancelHandle,
        options: ParseOptions<'_>,
    ) -> Result<String, EnhanceError> {
        let transport = &self.transport_options.provider;
        let api_base = transport.base_url.as_deref().unwrap_or(DEFAULT_API_BASE);
        let url = format!("{}{}", api_base.trim_end_matches('/'), ENHANCER_PATH);

        let http_client = build_http_client(&self.transport_options)?;

        let mut req = http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream");
        req = add_extra_headers(req, &transport.extra_headers);

        let body = EnhanceRequest {
            message: prompt.to_string(),
        };
        debug!(%url, "sending enhancement request");

        let response = tokio::select! {
            biased;
            _ = handle.cancelled() => return Err(EnhanceError::Cancelled),
            response = req.json(&body).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "prompt enhancer request failed");
            return Err(EnhanceError::Request { status, body });
        }

        let text = self
            .assembler
            .parse(response, options.with_cancel(handle.clone()))
            .await?;
        Ok(text)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<CancelHandle>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the enhancer's in-flight slot when a request ends or its future
/// is dropped. A newer request's handle is left alone.
struct InFlight<'e> {
    enhancer: &'e PromptEnhancer,
    handle: &'e CancelHandle,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.enhancer.lock_in_flight();
        if in_flight
            .as_ref()
            .is_some_and(|current| current.same_as(self.handle))
        {
            *in_flight = None;
        }
    }
}
