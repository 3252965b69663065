//! lspwire-probe: command-line smoke test for the client engine.
//!
//! Connects to a language server, opens one file, requests its symbol
//! outline, prints what comes back, then runs the shutdown handshake:
//!
//! ```bash
//! lspwire-probe rust-analyzer src/main.rs
//! RUST_LOG=lspwire=debug lspwire-probe gopls main.go
//! ```

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lspwire::capabilities::symbol_kind_name;
use lspwire::{ConnectParams, ConnectionStatus, DocumentSymbol, LspContext, Notification};

/// How long to wait for the handshake and for the symbol response.
const WAIT_BUDGET: Duration = Duration::from_secs(15);

/// Pump cadence; mirrors what a GUI event loop would do.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(program), Some(file)) = (args.next(), args.next()) else {
        eprintln!("usage: lspwire-probe <server-command> <file> [server-args...]");
        std::process::exit(2);
    };
    let server_args: Vec<String> = args.collect();

    let mut ctx = LspContext::new();
    let id = ctx.connect(
        &program,
        ConnectParams {
            args: server_args,
            ..ConnectParams::default()
        },
    );
    if !id.is_valid() {
        return Err(anyhow!("failed to spawn {}", program));
    }

    pump_until(&mut ctx, |ctx| {
        ctx.connection_status(id) == ConnectionStatus::Connected
    })?;
    if let Some(info) = ctx.server_info(id) {
        info!("connected to {} {}", info.name, info.version);
    }

    ctx.text_document_did_open(id, &file)?;
    ctx.text_document_symbol(id, &file)?;

    let mut symbols_printed = false;
    let deadline = Instant::now() + WAIT_BUDGET;
    while !symbols_printed && Instant::now() < deadline {
        ctx.process_responses();
        while let Some(event) = ctx.poll_notification(id) {
            match event {
                Notification::DocumentSymbols { uri, symbols } => {
                    println!("{}", uri);
                    for symbol in &symbols {
                        print_symbol(symbol, 1);
                    }
                    symbols_printed = true;
                }
                Notification::PublishDiagnostics { uri, diagnostics } => {
                    info!("{}: {} diagnostics", uri, diagnostics.len());
                }
            }
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
    if !symbols_printed {
        return Err(anyhow!("no symbol response within {:?}", WAIT_BUDGET));
    }

    ctx.text_document_did_close(id, &file)?;
    ctx.shutdown_server(id)?;
    pump_until(&mut ctx, |ctx| {
        ctx.connection_status(id) == ConnectionStatus::NotConnected
    })?;
    info!("shutdown handshake complete");
    Ok(())
}

/// Drive the pump until `done` holds or the wait budget runs out.
fn pump_until(ctx: &mut LspContext, done: impl Fn(&LspContext) -> bool) -> Result<()> {
    let deadline = Instant::now() + WAIT_BUDGET;
    while Instant::now() < deadline {
        ctx.process_responses();
        if done(ctx) {
            return Ok(());
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
    Err(anyhow!("timed out after {:?}", WAIT_BUDGET))
}

fn print_symbol(symbol: &DocumentSymbol, depth: usize) {
    println!(
        "{}{} {} [{}:{}..{}:{}]",
        "  ".repeat(depth),
        symbol_kind_name(symbol.kind),
        symbol.name,
        symbol.range.start.line,
        symbol.range.start.character,
        symbol.range.end.line,
        symbol.range.end.character,
    );
    for child in &symbol.children {
        print_symbol(child, depth + 1);
    }
}
