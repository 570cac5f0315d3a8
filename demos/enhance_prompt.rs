//! Stream an enhanced prompt from a running enhancer service.
//!
//! Run with:
//! ```bash
//! export ENHANCER_URL="http://localhost:5173"   # optional
//! cargo run --example enhance_prompt -- "build me a todo app"
//! ```
//!
//! Press Ctrl-C to cancel while the reply is streaming.

use std::io::Write;
use std::time::Duration;

use streamtext::client::{EnhanceError, PromptEnhancer};
use streamtext::options::{HttpTransport, TransportOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let mut transport = HttpTransport::default();
    if let Ok(url) = std::env::var("ENHANCER_URL") {
        transport = transport.with_base_url(url);
    }
    let transport_options = TransportOptions::new(transport).with_timeout(Duration::from_secs(60));

    let enhancer = PromptEnhancer::new(transport_options);

    println!("Enhancing prompt...\n");

    let enhance = enhancer.enhance_with(&prompt, |fragment| {
        print!("{}", fragment);
        let _ = std::io::stdout().flush();
    });
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            enhancer.cancel();
        }
        std::future::pending::<()>().await
    };

    let result = tokio::select! {
        result = enhance => result,
        _ = interrupt => unreachable!(),
    };

    match result {
        Ok(text) => {
            println!("\n\n=== Enhanced Prompt ===");
            println!("{}", text);
        }
        Err(EnhanceError::Cancelled) => {
            println!("\n\n=== Cancelled ===");
            println!("Partial text: {}", enhancer.snapshot().value);
        }
        Err(e) => {
            eprintln!("\nError: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
