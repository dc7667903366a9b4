//! # Weft - Dependency-Aware State Server
//!
//! The main binary for the Weft reactive state substrate.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for graph and cache operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                apps/weft (THE BINARY)             │
//! │                                                   │
//! │   ┌─────────────┐         ┌─────────────┐         │
//! │   │   CLI       │         │   HTTP API  │         │
//! │   │  (clap)     │         │   (axum)    │         │
//! │   └──────┬──────┘         └──────┬──────┘         │
//! │          │                       │                │
//! │          └───────────┬───────────┘                │
//! │                      ▼                            │
//! │              ┌───────────────┐                    │
//! │              │   weft-core   │                    │
//! │              │  (THE LOGIC)  │                    │
//! │              └───────────────┘                    │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! weft server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! weft run -f script.json
//! weft match 'tavolo.*.stato' tavolo.1.stato tavolo.2.stato
//! weft classify config.tema utente.1.ordine.corrente
//! ```

mod api;
mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — WEFT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("WEFT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weft=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Weft startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗    ██╗███████╗███████╗████████╗
  ██║    ██║██╔════╝██╔════╝╚══██╔══╝
  ██║ █╗ ██║█████╗  █████╗     ██║
  ██║███╗██║██╔══╝  ██╔══╝     ██║
  ╚███╔███╔╝███████╗██║        ██║
   ╚══╝╚══╝ ╚══════╝╚═╝        ╚═╝

  Dependency-Aware State Server v{}

  Reactive • Tiered • Deterministic
"#,
        env!("CARGO_PKG_VERSION")
    );
}
