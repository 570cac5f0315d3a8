//! # streamtext - incremental assembly of streamed model output
//!
//! A small library that turns the byte stream of a text-generation
//! response into the text a user should see, fragment by fragment.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Plain-text and Server-Sent Events bodies, detected on the fly
//! - Multi-byte characters split across network chunks decode correctly
//! - Cooperative cancellation that also interrupts a stalled read
//! - Observable progress through a `tokio::sync::watch` channel
//!
//! ## Architecture
//!
//! - **[`StreamAssembler`]**: reads one body per `parse` call and reports
//!   every fragment to an optional callback
//! - **[`PromptEnhancer`]**: POSTs a prompt to the enhancer endpoint and
//!   feeds the reply through an assembler
//! - **[`stream::stream_text`]**: the producer side, serving an improved
//!   prompt as an SSE body
//!
//! ## Example
//! ```
//! use streamtext::assembler::{ParseOptions, StreamAssembler};
//! use streamtext::model::Message;
//! use streamtext::stream::stream_text;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let body = stream_text(&[Message::user("add a dark mode toggle")]).into_sse_body();
//!
//!     let assembler = StreamAssembler::new();
//!     let text = assembler
//!         .parse(body, ParseOptions::new().on_fragment(|fragment| print!("{fragment}")))
//!         .await?;
//!
//!     assert_eq!(text, "Please assist with: add a dark mode toggle");
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod cancel;
pub mod client;
pub mod decode;
pub mod http;
pub mod model;
pub mod options;
pub mod source;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use assembler::{AssembleError, Framing, ParseOptions, Snapshot, StreamAssembler};
pub use cancel::CancelHandle;
pub use client::{EnhanceError, PromptEnhancer};
pub use source::{ByteStream, StreamSource};
