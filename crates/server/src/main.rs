use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use tunecast_core::{
    load_config, validate_config, Config, CycleReport, Dispatcher, PushHandler, PushScheduler,
    Schedule, Slot,
};
use tunecast_server::{api::create_router, logging, state::AppState};

/// Gap between the variants sent by `test-all`.
const TEST_ALL_GAP: Duration = Duration::from_secs(2);

/// tunecast: scheduled song recommendations for chat webhooks.
#[derive(Parser)]
#[command(name = "tunecast", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "TUNECAST_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Subcommand to run (defaults to `start`).
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily scheduler (and the status server if enabled).
    Start,

    /// Push one slot to every destination now.
    Push {
        /// morning, noon or night
        slot: Slot,
    },

    /// Push the evening message with the holiday greeting.
    Holiday,

    /// Push all four message variants, two seconds apart.
    TestAll,

    /// Rebuild every destination's catalog cache.
    Refresh,

    /// Forget every recommended song.
    ResetHistory,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    let _log_guard = logging::init(&config.storage.log_dir)?;
    info!(path = ?cli.config, "Configuration loaded");
    info!(
        policy = config.selection.policy.as_str(),
        weather = config.weather.enabled,
        server = config.server.enabled,
        "Settings"
    );

    let mut dispatcher = Dispatcher::from_config(&config)
        .await
        .context("Failed to initialise dispatcher")?;

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => start(config, dispatcher).await,
        Command::Push { slot } => {
            let report = dispatcher.run_cycle(slot, false).await;
            print_report(&report);
            Ok(())
        }
        Command::Holiday => {
            let report = dispatcher.run_cycle(Slot::Night, true).await;
            print_report(&report);
            Ok(())
        }
        Command::TestAll => {
            for report in dispatcher.test_all(TEST_ALL_GAP).await {
                print_report(&report);
            }
            Ok(())
        }
        Command::Refresh => {
            let total = dispatcher.refresh_all().await;
            println!(
                "Refreshed {} destination(s), {} song(s) cached",
                dispatcher.registry().len(),
                total
            );
            Ok(())
        }
        Command::ResetHistory => {
            dispatcher
                .reset_history()
                .await
                .context("Failed to reset history")?;
            println!("History cleared");
            Ok(())
        }
    }
}

async fn start(config: Config, dispatcher: Dispatcher) -> Result<()> {
    let schedule = Schedule::from_config(&config.schedule).context("Invalid schedule")?;
    let dispatcher = Arc::new(Mutex::new(dispatcher));
    let scheduler = Arc::new(PushScheduler::new(
        schedule,
        Arc::clone(&dispatcher) as Arc<dyn PushHandler>,
    ));

    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.run().await }
    });

    if config.server.enabled {
        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::clone(&dispatcher),
            Some(Arc::clone(&scheduler)),
        ));
        let app = create_router(state);

        let addr = SocketAddr::new(config.server.host, config.server.port);
        info!("Starting status server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
    } else {
        info!("Status server disabled");
        shutdown_signal().await;
    }

    info!("Shutting down...");
    scheduler.stop();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    let variant = if report.holiday {
        format!("{} (holiday)", report.slot)
    } else {
        report.slot.to_string()
    };
    println!("[{}] {}", report.cycle_id, variant);
    for outcome in &report.outcomes {
        println!("  {} -> {}", outcome.destination, outcome.result.label());
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
