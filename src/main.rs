//! Session Guard
//!
//! Activity-based session expiry for an interactive host:
//! - Throttled sampling of raw interaction events
//! - Warning, resume and expiry driven by an idle clock
//! - Presets and runtime reconfiguration
//! - Bounded-retry initialization with graceful fallback
//!
//! This binary reads events and commands line by line from stdin.

mod commands;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use guard_core::{Configuration, MessageKey, Preset};
use monitor::{
    registry, AlwaysReady, EngineMode, InitGuard, NotificationPort, TerminationPort,
};
use telemetry::{init_tracing_from_env, metrics, LogHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use commands::{Command, HELP};

/// Prints user-facing notices to stdout.
struct ConsoleNotifier;

impl NotificationPort for ConsoleNotifier {
    fn notify(&self, kind: MessageKey, text: &str) {
        println!("[{kind}] {text}");
    }
}

/// Stands in for the host's save and redirect logic.
struct ConsoleTerminator;

#[async_trait]
impl TerminationPort for ConsoleTerminator {
    async fn secure_data(&self) -> guard_core::Result<()> {
        info!("Flushing in-progress session data");
        tokio::task::yield_now().await;
        Ok(())
    }

    fn force_reauth(&self) {
        println!("[REAUTH] Session ended. Type 'init' to sign in again.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;
    let logs = init_tracing_from_env(config.debug_mode);

    info!("Starting Session Guard v{}", env!("CARGO_PKG_VERSION"));

    let registry = registry().clone();
    registry
        .config()
        .update(&config.as_patch())
        .context("Invalid session guard configuration")?;

    let guard = InitGuard::new(
        registry.clone(),
        Arc::new(AlwaysReady),
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleTerminator),
    );
    report_mode(guard.initialize().await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        match until_shutdown(run(command, &guard, &logs), shutdown.as_mut()).await {
                            Some(Ok(())) => {}
                            Some(Err(e)) => warn!(error = %e, "Command failed"),
                            None => break,
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ = shutdown.as_mut() => break,
        }
    }

    info!("Shutting down...");
    registry.shutdown();
    info!("Shutdown complete");
    Ok(())
}

async fn run(command: Command, guard: &InitGuard, logs: &LogHandle) -> Result<()> {
    let registry = registry();
    let store = registry.config();

    match command {
        Command::Event(kind) => {
            registry.bus().publish(kind);
        }
        Command::Status => print_json(&registry.status())?,
        Command::Metrics => print_json(&metrics().snapshot())?,
        Command::Config => print_json(&store.get())?,
        Command::Preset(name) => {
            store.apply_preset(&name)?;
            logs.set_debug_mode(store.read(|c| c.debug_mode));
        }
        Command::Update(patch) => {
            store.update(&patch)?;
            logs.set_debug_mode(store.read(|c| c.debug_mode));
        }
        Command::Reset => {
            store.reset()?;
            logs.set_debug_mode(store.read(|c| c.debug_mode));
        }
        Command::Extend => match registry.current() {
            Some(engine) => println!("{:?}", engine.extend_session().await),
            None => println!("No active session"),
        },
        Command::Logout => match registry.current() {
            Some(engine) => {
                engine.logout_now().await;
            }
            None => println!("No active session"),
        },
        Command::Init => report_mode(guard.force_init().await?),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Runs `work` unless `shutdown` completes first.
///
/// Commands such as `init` can back off for a long time; the same pinned
/// signal future is polled across commands so no signal is lost.
async fn until_shutdown<F: Future>(
    work: F,
    shutdown: Pin<&mut impl Future<Output = ()>>,
) -> Option<F::Output> {
    tokio::select! {
        output = work => Some(output),
        _ = shutdown => None,
    }
}

fn report_mode(mode: EngineMode) {
    match mode {
        EngineMode::Active(engine) => info!(session = %engine.id(), "Session guard active"),
        EngineMode::Fallback => error!("Session guard inactive; relying on host session expiry"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load configuration from files and environment.
///
/// `SESSION_GUARD_PRESET` is applied on top of everything else.
fn load_config() -> Result<Configuration> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Configuration::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/session-guard")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("SESSION_GUARD")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Configuration = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    if let Ok(name) = std::env::var("SESSION_GUARD_PRESET") {
        let preset: Preset = name.parse()?;
        config = config.merged(&preset.partial());
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
