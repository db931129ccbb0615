use clap::Parser;
use punchcard::adapters::{ChainClient, EtherscanClient, RpcChainClient};
use punchcard::cli::{run_menu, Cli, Commands};
use punchcard::config::{AppConfig, LoggingSettings};
use punchcard::domain::ActionKind;
use punchcard::error::{PunchcardError, Result};
use punchcard::services::{BatchRunner, ClaimResolver, SignScheduler, TxSubmitter};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config error: {}", e);
        }
        return Err(PunchcardError::Validation(format!(
            "{} invalid configuration value(s)",
            errors.len()
        )));
    }

    info!(
        "punchcard starting (chain id {}, contract {})",
        config.chain.chain_id, config.chain.contract
    );

    let runner = Arc::new(build_runner(&config)?);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Register => {
            runner.run(ActionKind::Register).await;
        }
        Commands::Sign => {
            runner.run(ActionKind::Sign).await;
        }
        Commands::Schedule => {
            let handle = SignScheduler::new(Arc::clone(&runner), &config.schedule).start();
            shutdown_signal().await;
            info!("Shutdown signal received");
            handle.stop().await;
        }
        Commands::Menu => {
            run_menu(runner, &config.schedule).await?;
        }
    }

    Ok(())
}

fn build_runner(config: &AppConfig) -> Result<BatchRunner> {
    let contract = config.chain.contract_address()?;
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect(&config.chain.rpc_url)?);

    let submitter = TxSubmitter::new(
        Arc::clone(&chain),
        contract,
        config.chain.chain_id,
        config.submit.clone(),
    );

    let explorer = EtherscanClient::new(
        config.explorer.clone(),
        config.chain.chain_id,
        config.chain.contract.clone(),
    )?;
    let resolver = ClaimResolver::new(Arc::new(explorer), &config.claim)?;

    BatchRunner::new(chain, submitter, resolver, config)
}

fn init_logging(settings: &LoggingSettings) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", settings.level)));

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial log file, and this build aborts on panic, so writability is
    // checked first.
    let file_layer = if std::fs::create_dir_all(&settings.dir).is_ok() {
        let test_path = std::path::Path::new(&settings.dir).join(".punchcard_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                // Daily rotating file appender
                let file_appender = tracing_appender::rolling::daily(&settings.dir, "punchcard.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false) // No color codes in file
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not write to log directory {} ({}), file logging disabled",
                    settings.dir, e
                );
                None
            }
        }
    } else {
        eprintln!(
            "Warning: could not create log directory {}, file logging disabled",
            settings.dir
        );
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
