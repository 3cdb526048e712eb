//! session-relay binary entry point.

use std::sync::Arc;

use session_relay::api::{self, AppState};
use session_relay::cli::{self, Args};
use session_relay::config::Config;
use session_relay::{
    logging, CommandRegistry, Dispatcher, MemoryDataSource, ShutdownCoordinator, ShutdownJobs,
    StdProcessExit,
};
use tokio::sync::Notify;
use tracing::{error, info};

#[tokio::main]
async fn main() -> session_relay::Result<()> {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'session-relay --help' for more information.");
            std::process::exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return Ok(());
    }
    if args.version {
        cli::print_version();
        return Ok(());
    }

    run(args).await
}

async fn run(args: Args) -> session_relay::Result<()> {
    let (config, server_config) = match Config::load(&args)
        .and_then(|config| config.to_server_config().map(|server| (config, server)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_with_filter(config.log_filter());
    info!("session-relay v{}", env!("CARGO_PKG_VERSION"));

    // Data source and dispatcher
    let data_source = Arc::new(MemoryDataSource::with_users(config.seed_users()));
    info!(users = data_source.user_count(), "in-memory data source ready");

    let dispatcher = Arc::new(Dispatcher::new(CommandRegistry::standard()?, data_source));
    info!(
        commands = ?dispatcher.registry().names(),
        "command registry initialized"
    );

    if let Some(max_idle) = config.idle_session_limit() {
        Arc::clone(&dispatcher).spawn_idle_reaper(max_idle);
        info!(?max_idle, "idle session reaper started");
    }

    // API server
    let listener = api::bind(&server_config).await?;
    let stop = Arc::new(Notify::new());
    let server_failed = Arc::new(Notify::new());
    let server = {
        let stop = Arc::clone(&stop);
        let server_failed = Arc::clone(&server_failed);
        let state = AppState::new(Arc::clone(&dispatcher));
        tokio::spawn(async move {
            let result = api::serve(listener, state, async move { stop.notified().await }).await;
            if let Err(ref e) = result {
                error!(error = %e, "API server stopped unexpectedly");
                server_failed.notify_one();
            }
            result
        })
    };

    // Cleanup jobs, run in registration order on the first signal
    let jobs = Arc::new(ShutdownJobs::new());
    let graceful = server_config.graceful_shutdown;
    jobs.add_job(
        move || async move {
            if !graceful {
                server.abort();
                return true;
            }
            stop.notify_one();
            match server.await {
                Ok(Ok(())) => true,
                Ok(Err(_)) => false,
                Err(e) => {
                    error!(error = %e, "API server task failed");
                    false
                }
            }
        },
        Some("api server"),
    );

    let session_state = Arc::clone(&dispatcher);
    jobs.add_sync_job(
        move || {
            let identities = session_state.identities().clear();
            let sessions = session_state.sessions().clear();
            match (identities, sessions) {
                (Ok(identities), Ok(sessions)) => {
                    info!(identities, sessions, "session state cleared");
                    true
                }
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "failed to clear session state");
                    false
                }
            }
        },
        Some("session state"),
    );

    let (coordinator, signals) =
        ShutdownCoordinator::install(jobs, config.to_shutdown_config(), Arc::new(StdProcessExit));

    tokio::select! {
        _ = signals => {}
        _ = server_failed.notified() => {
            coordinator.terminate("server failure").await;
        }
    }

    Ok(())
}
