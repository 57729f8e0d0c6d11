use clap::Parser;
use log::{error, info, warn};
use sale_sentry_core::native::{NativeHttpClient, NativeRpcClient, TwitterClient, TwitterCredentials};
use sale_sentry_core::{
    CoreError, Dispatcher, LogOnlyPoster, MarketplaceRegistry, MetadataResolver, PollerConfig,
    SalePoller, Settings, SocialPoster, StopHandle, TraitFilter, Waiter,
};
use std::future::Future;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Watch an NFT collection's account for marketplace sales and post them.
#[derive(Parser, Debug)]
#[command(name = "sale_sentry", version, about)]
struct Cli {
    /// Settings file; falls back to SALE_SENTRY_CONFIG_PATH, then config.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Log qualifying sales instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    // Unconditional so a silent RUST_LOG typo still shows the binary started.
    println!(
        "sale_sentry starting (pid {}), RUST_LOG={:?}",
        std::process::id(),
        std::env::var("RUST_LOG").ok()
    );

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SALE_SENTRY_CONFIG_PATH").ok())
        .unwrap_or_else(|| "config.toml".to_string());
    let settings = load_settings(&config_path, cli.dry_run)?;
    log_settings(&settings);

    let rpc_client = NativeRpcClient::new(settings.solana_rpc_url.clone());
    let http_client = NativeHttpClient::new();
    let poster: Box<dyn SocialPoster> = if settings.post_enabled {
        Box::new(TwitterClient::new(TwitterCredentials::from_settings(&settings)))
    } else {
        warn!("Posting disabled: sales will only be logged");
        Box::new(LogOnlyPoster)
    };

    let resolver = MetadataResolver::new(&rpc_client, &http_client, settings.metadata_program.clone());
    let dispatcher = Dispatcher::new(
        poster.as_ref(),
        &http_client,
        attach_images(&settings),
        settings.explorer_base_url.clone(),
    );

    let (waiter, stop) = Waiter::new();
    tokio::spawn(stop_on_signal(stop, wait_for_shutdown_signal()));

    let mut poller = SalePoller::new(
        &rpc_client,
        &resolver,
        &dispatcher,
        MarketplaceRegistry::from_config(&settings.marketplaces),
        TraitFilter::from_settings(&settings),
        PollerConfig::from_settings(&settings),
        waiter,
    );
    let last_cursor = poller.run(settings.seed_signature.clone()).await;

    poller.log_metrics();
    info!("Stopped. To resume from here set seed_signature = {}", last_cursor);
    Ok(())
}

/// Load and validate settings. Either failure is fatal and logged.
fn load_settings(config_path: &str, dry_run: bool) -> Result<Settings, CoreError> {
    let mut settings = Settings::from_file(config_path).map_err(|e| {
        error!("Failed to load configuration ({}): {}", config_path, e);
        e
    })?;
    if dry_run {
        settings.post_enabled = false;
    }
    if let Err(e) = settings.validate() {
        error!("Invalid configuration ({}): {}", config_path, e);
        return Err(e);
    }
    Ok(settings)
}

/// Images are only fetched when there is a real poster to upload them to.
fn attach_images(settings: &Settings) -> bool {
    settings.attach_image && settings.post_enabled
}

/// Stop the watcher once `signal` resolves. If the listener could not be
/// installed the watcher keeps running.
async fn stop_on_signal<F>(stop: StopHandle, signal: F)
where
    F: Future<Output = Result<(), std::io::Error>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown requested, finishing current step");
            stop.stop();
        }
        Err(e) => error!("Failed to listen for shutdown signal, running until killed: {}", e),
    }
}

fn log_settings(settings: &Settings) {
    info!("Watching account: {}", settings.watched_account);
    info!("RPC endpoint: {}", settings.solana_rpc_url);
    info!("Seed signature: {}", settings.seed_signature);
    info!(
        "Filter: {} = {}, poll every {} ms, {} ms between transaction fetches",
        settings.trait_type, settings.trait_value, settings.poll_interval_ms, settings.rpc_call_interval_ms
    );
    info!(
        "Posting: {}, attach image: {}, extra marketplaces: {}",
        if settings.post_enabled { "enabled" } else { "dry run" },
        settings.attach_image,
        settings.marketplaces.len()
    );
}

/// Wait for SIGINT/Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal() -> Result<(), std::io::Error> {
    #[cfg(unix)]
    {
        let mut sigint_stream = signal(SignalKind::interrupt())?;
        let mut sigterm_stream = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint_stream.recv() => info!("SIGINT/Ctrl+C signal received"),
            _ = sigterm_stream.recv() => info!("SIGTERM signal received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C signal received");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["sale_sentry", "--dry-run", "-c", "bears.toml"]);
        assert!(cli.dry_run);
        assert!(!cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("bears.toml"));

        let cli = Cli::parse_from(["sale_sentry"]);
        assert!(!cli.dry_run);
        assert!(cli.config.is_none());
    }

    const VALID_CONFIG: &str = r#"
watched_account = "G1GP13EJK23nr7YL69SJWn7CWtm8hQBQCiebssinU1Jc"
seed_signature = "3hizm34taS8t9UvpJg9oRCJ7EWYkuUHNCecrhuBZjG7L2RfqEqgApn2VsKS94Agj9UgBdgQT6HsaaFRUu7ZT44sU"
twitter_api_key = "k"
twitter_api_secret = "s"
twitter_access_token = "t"
twitter_access_token_secret = "ts"
"#;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_load_settings_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "watched_account = [unterminated");
        assert!(matches!(load_settings(&path, false), Err(CoreError::Config(_))));

        let path = write_config(&dir, "poll_interval_ms = \"soon\"");
        assert!(load_settings(&path, false).is_err());
    }

    #[test]
    fn test_load_settings_dry_run_disables_posting_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, VALID_CONFIG);

        let live = load_settings(&path, false).unwrap();
        assert!(live.post_enabled);
        assert!(attach_images(&live));

        let dry = load_settings(&path, true).unwrap();
        assert!(!dry.post_enabled);
        assert!(dry.attach_image);
        assert!(!attach_images(&dry));
    }

    #[tokio::test]
    async fn test_signal_listener_failure_keeps_running() {
        let (waiter, stop) = Waiter::new();
        stop_on_signal(stop, async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "signal driver unavailable"))
        })
        .await;
        assert!(!waiter.is_stopped());
    }

    #[tokio::test]
    async fn test_signal_stops_watcher() {
        let (waiter, stop) = Waiter::new();
        stop_on_signal(stop, async { Ok(()) }).await;
        assert!(waiter.is_stopped());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_for_shutdown_signal_sigterm() {
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            unsafe {
                libc::raise(libc::SIGTERM);
            }
        });
        assert!(wait_for_shutdown_signal().await.is_ok());
    }
}
