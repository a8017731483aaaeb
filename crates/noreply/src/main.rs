//! `noreply` - send no-reply transactional email from the command line.
//!
//! Usage:
//!   noreply --database sqlite:///app.db welcome --user-id 1
//!   noreply payment-confirmation --user-id 1 --amount 49.99 --payment-date 2025-12-01
//!   noreply send --to user@example.com --subject "Hello" --html body.html
//!
//! SMTP settings come from `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`,
//! `SMTP_PASSWORD`, `SMTP_USE_TLS`, `SMTP_USE_SSL`, `FROM_EMAIL` and
//! `FROM_NAME`, optionally backed by a JSON file given with `--config`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noreply=info,noreply_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}
