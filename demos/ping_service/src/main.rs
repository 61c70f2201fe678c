//! Ping Service Example
//!
//! Runs a handler service and a gateway in one process, connected by an
//! in-memory bus, and pushes a handful of events through them:
//!
//! ```text
//! gateway.ask(event) ──▶ event.user.input ──▶ HandlerService ──▶ Router
//!        ▲                                                        │
//!        └──────────── event.user.response ◀── BusPublisher ◀─────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ping-service
//! cargo run --package ping-service -- --timeout-ms 200
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use courier::prelude::*;
use courier::runtime::logging;
use serde_json::json;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Courier ping service demo")]
struct Args {
    /// Configuration file to load instead of searching the default locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `rpc.timeout_ms`.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn ping(ctx: Context) -> HandlerResult {
    ctx.send_message("pong", MessageOptions::default());
    Ok(())
}

async fn menu(ctx: Context) -> HandlerResult {
    let keyboard = json!({
        "inline_keyboard": [[{ "text": "Confirm", "callback_data": "confirm" }]]
    });
    ctx.send_message("Pick one:", MessageOptions::new().markup(keyboard));
    Ok(())
}

// Both responses are published, but `Gateway::ask` returns only the first
// reply for a correlation id, so the demo logs the edit.
async fn confirm(ctx: Context) -> HandlerResult {
    ctx.edit_message("Confirmed.", MessageOptions::new().next_state("confirmed"));
    ctx.answer_callback("Done", MessageOptions::default());
    Ok(())
}

async fn echo(ctx: Context) -> HandlerResult {
    let text = ctx
        .event()
        .text()
        .and_then(|t| t.strip_prefix("echo "))
        .unwrap_or_default()
        .to_string();
    ctx.send_message(text, MessageOptions::default());
    Ok(())
}

async fn slow(ctx: Context) -> HandlerResult {
    // Longer than the default RPC timeout.
    tokio::time::sleep(Duration::from_secs(6)).await;
    ctx.send_message("finally", MessageOptions::default());
    Ok(())
}

/// Routes owned by a separate feature module.
fn settings_routes() -> RouteGroup {
    RouteGroup::new()
        .command("/settings", |ctx: Context| async move {
            ctx.send_message("Settings are not available yet.", MessageOptions::default());
            Ok::<(), BoxError>(())
        })
        .callback("reset", |ctx: Context| async move {
            ctx.answer_callback("Reset.", MessageOptions::default());
            Ok::<(), BoxError>(())
        })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        let mut overrides = CourierConfig::default();
        overrides.rpc.timeout_ms = timeout_ms;
        loader = loader.merge(overrides);
    }
    let config = loader.load()?;
    logging::init_from_config(&config.logging);

    let bus = Arc::new(MemoryBus::with_capacity(config.bus.channel_capacity));

    // Handler side
    let mut router = Router::new(BusPublisher::new(bus.clone(), &config.bus.reply_stream))
        .with_middleware(TracingMiddleware);
    router.command("/ping", ping);
    router.command("/menu", menu);
    router.command("/slow", slow);
    router.callback("confirm", confirm);
    router.message(
        |event: &Event| event.text().is_some_and(|t| t.starts_with("echo ")),
        echo,
    );
    router.include(settings_routes());

    let service = HandlerService::from_config(bus.clone(), router, &config.bus);
    service.start().await?;

    // Gateway side
    let gateway = Gateway::connect(bus, &config).await?;

    let events = [
        Event::message(1, 100, "/ping"),
        Event::message(1, 100, "/menu"),
        Event::callback(1, 100, "confirm").with_message_id(42),
        Event::message(1, 100, "echo hello courier"),
        Event::message(1, 100, "/settings"),
        Event::message(1, 100, "/unknown"),
        Event::message(1, 100, "/slow"),
    ];

    for event in events {
        let input = event
            .text()
            .or(event.callback_data())
            .unwrap_or_default()
            .to_string();
        let response = gateway.ask(event).await?;
        info!(
            input = %input,
            action = %response.action,
            text = response.text().unwrap_or_default(),
            edit_target = ?response.edit_target(),
            "Gateway received response"
        );
    }

    service.shutdown().await;
    Ok(())
}
