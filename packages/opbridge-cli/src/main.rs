//! OPBridge CLI
//!
//! Drives deposits and withdrawals between an L1 and its OP-stack L2 with a
//! single mnemonic-derived account:
//!
//! - `opbridge balances` - native balances on both layers
//! - `opbridge deposit --gwei N` - deposit and wait for the L2 relay
//! - `opbridge withdraw --gwei N` - withdraw, prove, wait out the challenge
//!   window, finalize
//! - `opbridge resume --state FILE` - continue an interrupted message
//! - `opbridge demo` - deposit 1000 gwei, then withdraw 0.01 ETH
//!
//! Ctrl-C / SIGTERM cancel the running wait; the message snapshot in
//! `--state` stays resumable.

mod config;
mod report;
mod state;

use clap::{Parser, Subcommand};
use config::Config;
use eyre::{eyre, Result, WrapErr};
use opbridge_rs::{
    connect_endpoint, CancelHandle, CancelSignal, CrossDomainMessenger, FlowFailure, Layer,
    LifecycleEvent, Message, SignerIdentity, WaitOptions,
};
use state::StateFile;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Withdrawal leg of the demo: 0.01 ETH
const DEMO_WITHDRAW_GWEI: u64 = 10_000_000;
const DEMO_DEPOSIT_GWEI: u64 = 1_000;

#[derive(Parser)]
#[command(name = "opbridge")]
#[command(about = "Bridge ether between an L1 and its OP-stack L2", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show native balances of the signer on both layers
    Balances,

    /// Deposit ether from L1 to L2
    Deposit {
        /// Amount in gwei
        #[arg(long)]
        gwei: u64,

        /// Persist the message here after every stage
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Withdraw ether from L2 to L1
    Withdraw {
        /// Amount in gwei
        #[arg(long)]
        gwei: u64,

        /// Persist the message here after every stage
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Continue a message saved with --state
    Resume {
        #[arg(long)]
        state: PathBuf,
    },

    /// Deposit 1000 gwei, then withdraw 0.01 ETH
    Demo {
        /// Persist each message here after every stage
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load()?;
    info!(
        l1_rpc = %config.l1_rpc_url,
        l2_rpc = %config.l2_rpc_url,
        challenge_period_secs = config.messenger.challenge_period_secs,
        "Configuration loaded"
    );

    let identity = SignerIdentity::from_mnemonic(config.mnemonic.expose())
        .wrap_err("Invalid MNEMONIC")?;
    let l1 = connect_endpoint(Layer::L1, &config.l1_rpc_url, &identity)
        .await
        .wrap_err("Failed to connect to L1")?;
    let l2 = connect_endpoint(Layer::L2, &config.l2_rpc_url, &identity)
        .await
        .wrap_err("Failed to connect to L2")?;
    info!(signer = %identity.address(), "Signer ready");

    let (cancel, signal) = CancelSignal::channel();
    tokio::spawn(cancel_on_shutdown(cancel));
    let opts = config.messenger.wait_options().with_cancel(signal);

    let state = match &cli.command {
        Commands::Deposit { state, .. }
        | Commands::Withdraw { state, .. }
        | Commands::Demo { state } => state.clone().map(StateFile::new),
        Commands::Resume { state } => Some(StateFile::new(state.clone())),
        Commands::Balances => None,
    };
    let (events, reporter) = spawn_reporter(state.clone(), config.explorer_url.clone());
    let messenger =
        CrossDomainMessenger::new(config.messenger.clone(), l1, l2)?.with_events(events);

    let result = run(&messenger, cli.command, state.as_ref(), &opts).await;

    // Closing the event channel lets the reporter drain and exit
    drop(messenger);
    if let Err(e) = reporter.await {
        warn!(error = %e, "Event reporter stopped abnormally");
    }
    result
}

async fn run(
    messenger: &CrossDomainMessenger,
    command: Commands,
    state: Option<&StateFile>,
    opts: &WaitOptions,
) -> Result<()> {
    match command {
        Commands::Balances => {
            let balances = messenger.get_balances().await?;
            report::log_balances("Current", &balances);
        }
        Commands::Deposit { gwei, .. } => {
            let result = messenger
                .deposit_native(report::gwei_to_wei(gwei), opts)
                .await;
            finish("Deposit", result, state)?;
        }
        Commands::Withdraw { gwei, .. } => {
            let result = messenger
                .withdraw_native(report::gwei_to_wei(gwei), opts)
                .await;
            finish("Withdrawal", result, state)?;
        }
        Commands::Resume { .. } => {
            let state = state.ok_or_else(|| eyre!("--state is required to resume"))?;
            let mut message = state.load()?;
            info!(
                msg = %message.short_hash(),
                direction = %message.direction,
                status = %message.status,
                "Loaded message"
            );
            let result = messenger.resume(&mut message, opts).await;
            state.save(&message)?;
            result.wrap_err_with(|| {
                format!("Resume of {} stopped at {}", message.short_hash(), message.status)
            })?;
            info!(msg = %message.short_hash(), "Message relayed");
        }
        Commands::Demo { .. } => {
            report::log_balances("Starting", &messenger.get_balances().await?);

            let result = messenger
                .deposit_native(report::gwei_to_wei(DEMO_DEPOSIT_GWEI), opts)
                .await;
            finish("Deposit", result, state)?;
            report::log_balances("After deposit", &messenger.get_balances().await?);

            let result = messenger
                .withdraw_native(report::gwei_to_wei(DEMO_WITHDRAW_GWEI), opts)
                .await;
            finish("Withdrawal", result, state)?;
            report::log_balances("After withdrawal", &messenger.get_balances().await?);
        }
    }
    Ok(())
}

/// Log the outcome of a flow and keep its last snapshot on failure
fn finish(
    what: &str,
    result: std::result::Result<Message, FlowFailure>,
    state: Option<&StateFile>,
) -> Result<()> {
    match result {
        Ok(message) => {
            info!(
                msg = %message.short_hash(),
                amount = %report::format_gwei(message.amount),
                "{} relayed",
                what
            );
            Ok(())
        }
        Err(failure) => {
            if let Some(message) = &failure.message {
                if let Some(state) = state {
                    state.save(message)?;
                }
                if failure.error.is_resumable() {
                    error!(
                        msg = %message.short_hash(),
                        status = %message.status,
                        "{} interrupted; rerun with `opbridge resume --state FILE` to continue",
                        what
                    );
                }
            }
            Err::<(), _>(failure).wrap_err_with(|| format!("{} failed", what))
        }
    }
}

/// Log every lifecycle event and mirror the message into `state`
fn spawn_reporter(
    state: Option<StateFile>,
    explorer: Option<String>,
) -> (mpsc::UnboundedSender<LifecycleEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LifecycleEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            report::log_event(explorer.as_deref(), &event);
            if let Some(state) = &state {
                if let Err(e) = state.save(&event.message) {
                    warn!(path = %state.path().display(), error = %e, "Failed to save message state");
                }
            }
        }
    });
    (tx, handle)
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,opbridge=debug,opbridge_rs=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

async fn cancel_on_shutdown(cancel: CancelHandle) {
    wait_for_shutdown_signal().await;
    cancel.cancel();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_parse_deposit() {
        let cli = Cli::try_parse_from(["opbridge", "deposit", "--gwei", "1000"]).unwrap();
        match cli.command {
            Commands::Deposit { gwei, state } => {
                assert_eq!(gwei, 1000);
                assert!(state.is_none());
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn test_resume_requires_state() {
        assert!(Cli::try_parse_from(["opbridge", "resume"]).is_err());
        let cli =
            Cli::try_parse_from(["opbridge", "resume", "--state", "withdrawal.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Resume { .. }));
    }

    #[test]
    fn test_demo_amounts() {
        assert_eq!(
            report::gwei_to_wei(DEMO_WITHDRAW_GWEI),
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(report::format_gwei(report::gwei_to_wei(DEMO_DEPOSIT_GWEI)), "1000 gwei");
    }
}
