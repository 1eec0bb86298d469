use anyhow::Context;
use clap::Parser;
use update_poller::core::ConfigProvider;
use update_poller::utils::error::{ErrorSeverity, PollerError};
use update_poller::utils::{logger, validation::Validate};
use update_poller::{CliConfig, FileDisplay, HttpFetcher, PollEngine, PollerConfig, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 載入 TOML 配置 (若有指定)
    let toml_config = match &args.config {
        Some(path) => Some(
            TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        ),
        None => None,
    };

    let verbose = args.verbose || toml_config.as_ref().is_some_and(TomlConfig::verbose);
    let json_logs = args.json_logs || toml_config.as_ref().is_some_and(TomlConfig::json_logs);

    // 初始化日誌
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting update-poller");
    if verbose {
        tracing::debug!("CLI config: {:?}", args);
    }

    let result = match &toml_config {
        Some(config) => execute(config, &args).await,
        None => execute(&args, &args).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Polling failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn execute<C>(config: &C, args: &CliConfig) -> Result<(), PollerError>
where
    C: ConfigProvider + Validate,
{
    config.validate()?;
    let fetcher = HttpFetcher::new(config.base_url(), config.endpoint())?;

    display_config_summary(config, &fetcher);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests will be sent");
        return Ok(());
    }

    // 輸出目錄即為頁面，區域檔案由 poller 寫入
    tokio::fs::create_dir_all(config.output_dir()).await?;
    let display = FileDisplay::new(config.output_dir());

    let mut engine = PollEngine::new(fetcher, display, PollerConfig::from_provider(config));
    let exit = engine.run_until(shutdown_signal()).await?;

    println!("Poll chain ended: {:?}", exit);
    if args.print_stats {
        if let Some(stats) = engine.monitor().get_stats() {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn display_config_summary<C: ConfigProvider>(config: &C, fetcher: &HttpFetcher) {
    tracing::info!("🔗 Endpoint: {}", fetcher.url());
    tracing::info!("⏱️ Interval: {:?}", config.interval());
    tracing::info!("🧯 On failure: {:?}", config.failure_policy());
    tracing::info!(
        "🖼️ Target: {}/{}.html",
        config.output_dir().trim_end_matches('/'),
        config.target()
    );
    if let Some(max) = config.max_cycles() {
        tracing::info!("🔢 Max cycles: {}", max);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
