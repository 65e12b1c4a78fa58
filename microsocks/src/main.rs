//! `microsocks`: a small SOCKS5 proxy server CLI (§6) built on `rama_socks5`.

mod cli;

use std::time::Duration;

use clap::Parser;
use rama_error::ErrorContext;
use rama_socks5::{AuthPolicy, DnsBackedResolver, Executor, Server, ServerContext, TrafficCounters};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, ServerConfig};

fn init_tracing(quiet: bool) {
    let default_level = if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

#[cfg(unix)]
fn ignore_sigpipe() {
    // SAFETY: installing SIG_IGN for SIGPIPE is the standard, signal-safe
    // way to stop a peer's closed read side from killing the process on
    // write; this must happen once, before any socket I/O.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

#[cfg(not(unix))]
fn ignore_sigpipe() {}

fn build_context(config: &ServerConfig, executor: Executor) -> ServerContext {
    let auth = match &config.credentials {
        Some((user, pass)) => {
            let policy = AuthPolicy::with_credentials(user.clone(), pass.clone());
            if config.auth_once {
                policy.with_auth_once()
            } else {
                policy
            }
        }
        None => AuthPolicy::open(),
    };

    ServerContext::new(
        auth,
        TrafficCounters::new(),
        DnsBackedResolver::default(),
        config.bind_addr,
        executor,
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match ServerConfig::from_cli(cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("microsocks: {message}");
            std::process::exit(1);
        }
    };

    init_tracing(config.quiet);
    ignore_sigpipe();

    let graceful = tokio_graceful::Shutdown::default();
    let executor = Executor::graceful(graceful.guard());

    let listen_addr = config.listen_addr;
    let ctx = build_context(&config, executor);

    let server = match Server::bind(listen_addr, ctx)
        .await
        .context("bind SOCKS5 listener")
    {
        Ok(server) => server,
        Err(err) => {
            error!(%err, %listen_addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(%listen_addr, "microsocks: listening");
    graceful.spawn_task_fn(|_guard| server.serve());

    if let Err(err) = graceful.shutdown_with_limit(Duration::from_secs(30)).await {
        error!(%err, "graceful shutdown did not complete cleanly");
    }
}
