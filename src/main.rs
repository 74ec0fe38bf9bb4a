//! Anyma Pal - Rust implementation
//!
//! Bridges the Anyma Phi editor protocol to a sequencer: parameter changes
//! reported over SysEx come out as Control Change messages.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use anyma_pal::monitor;
use anyma_pal::paths::AppPaths;
use anyma_pal::transport::{self, InputPort};
use anyma_pal::{AppConfig, Bridge, ConsoleSink, Delivery, SessionController, SessionState, SharedSink};

use crate::cli::Command;

/// Anyma Pal - record Anyma Phi edits as MIDI CC
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print frames from the device input with their classification
    #[arg(long)]
    monitor: bool,

    /// Log sequencer-bound messages instead of opening a sequencer port
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::detect(args.config.as_deref());
    let config = AppConfig::load_or_default(&paths.config).await?;

    let log_dir = if config.logging.file {
        let dir = match &config.logging.directory {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => {
                paths.ensure_logs_dir()?;
                paths.logs_dir.clone()
            }
        };
        Some(dir)
    } else {
        None
    };
    let _log_guard = init_logging(&args.log_level, log_dir.as_deref())?;

    info!("Starting Anyma Pal v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    if args.list_ports {
        monitor::list_ports_formatted();
        return Ok(());
    }

    if args.monitor {
        monitor::run_monitor(&config.midi.device_input).await?;
        return Ok(());
    }

    run_app(config, args.dry_run).await?;

    info!("Anyma Pal shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, dry_run: bool) -> Result<()> {
    let bridge = Arc::new(Bridge::new());
    let session = Arc::new(SessionController::new(config.session.timing())?);

    // Sequencer side
    let sequencer: SharedSink = if dry_run {
        info!("Dry run: sequencer messages are logged only");
        Arc::new(ConsoleSink::new("console"))
    } else {
        Arc::new(transport::open_sequencer_output(&config.midi.sequencer_port)?)
    };
    bridge.bind_sequencer_output(Some(sequencer));

    // Device side; a missing device is not fatal, it can be bound from the REPL
    bind_device_output(&session, &config.midi.device_output);
    let input = InputPort::new();
    bind_device_input(&input, &bridge, &config.midi.device_input);

    if config.session.auto_start {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.start().await });
    }

    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let _repl = cli::spawn_repl(command_tx)?;
    println!("{}", "Type 'help' for commands".dimmed());

    let mut state_rx = session.subscribe();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                if command == Command::Quit {
                    break;
                }
                handle_command(command, &session, &bridge, &input);
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                match state {
                    SessionState::Active => println!("{}", "Session active".green().bold()),
                    SessionState::Idle => println!("{}", "Session idle".yellow()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Waits for an in-flight transition, then sends the final dump if needed
    info!("Leaving editor mode before exit...");
    session.stop().await;
    input.unbind();

    Ok(())
}

fn handle_command(
    command: Command,
    session: &Arc<SessionController>,
    bridge: &Arc<Bridge>,
    input: &InputPort,
) {
    match command {
        Command::Start => spawn_transition(session, |s| async move { s.start().await }),
        Command::Stop => spawn_transition(session, |s| async move { s.stop().await }),
        Command::Toggle => spawn_transition(session, |s| async move {
            s.toggle().await;
        }),
        Command::Status => print_status(session, bridge, input),
        Command::Dump => match session.request_dump() {
            Delivery::Sent => println!("Patch dump requested"),
            Delivery::Unbound => println!("{}", "No device output bound".red()),
            Delivery::Failed => println!("{}", "Send failed, see log".red()),
        },
        Command::Ports => monitor::list_ports_formatted(),
        Command::Output(pattern) => bind_device_output(session, &pattern),
        Command::Input(pattern) => bind_device_input(input, bridge, &pattern),
        Command::Help => println!("{}", cli::HELP),
        Command::Quit => {}
    }
}

/// Run a session transition without blocking the command loop
fn spawn_transition<F, Fut>(session: &Arc<SessionController>, transition: F)
where
    F: FnOnce(Arc<SessionController>) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(transition(Arc::clone(session)));
}

fn bind_device_output(session: &SessionController, pattern: &str) {
    match transport::open_output(pattern) {
        Ok(output) => session.bind_device_output(Some(Arc::new(output))),
        Err(e) => {
            warn!("Device output unavailable: {:#}", e);
            session.bind_device_output(None);
        }
    }
}

fn bind_device_input(input: &InputPort, bridge: &Arc<Bridge>, pattern: &str) {
    if let Err(e) = input.bind(pattern, bridge.frame_handler()) {
        warn!("Device input unavailable: {:#}", e);
    }
}

fn print_status(session: &SessionController, bridge: &Bridge, input: &InputPort) {
    let state = match session.state() {
        SessionState::Active => "active".green().bold(),
        SessionState::Idle => "idle".yellow(),
    };
    let unbound = || "unbound".red().to_string();
    let stats = bridge.stats();

    println!("Session:         {}", state);
    println!("Device input:    {}", input.bound_port().unwrap_or_else(unbound));
    println!("Device output:   {}", session.device_output().unwrap_or_else(unbound));
    println!("Sequencer:       {}", bridge.sequencer_output().unwrap_or_else(unbound));
    let timing = session.timing();
    println!(
        "Timing:          keep-alive {}ms, poll {}ms, settle {}ms/{}ms",
        timing.keep_alive_interval.as_millis(),
        timing.status_poll_interval.as_millis(),
        timing.start_settle.as_millis(),
        timing.stop_settle.as_millis()
    );
    println!(
        "Frames:          {} received, {} dumps, {} CC, {} dropped",
        stats.received, stats.dumps_forwarded, stats.cc_emitted, stats.dropped
    );
}

/// Console logging, plus a daily rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "anyma-pal.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}
