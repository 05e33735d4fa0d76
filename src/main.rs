use collection_crafting::{
    PanelConfig,
    Recipe,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const DEFAULT_DATA_DIR: &str = "~/.collection-crafting";
const LOG_FILE_PREFIX: &str = "collection-crafting.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: collection-crafting [--data-dir <path>] [--catalog <path>]\n\
         [--timeout <secs>] [--latency <secs>] [--offline] [--stat-clock]\n\
         \n\
         Flags:\n\
           --data-dir <path>  Directory for the dropped-items ledger and logs (default {})\n\
           --catalog <path>   Load item definitions and collections from a JSON file\n\
           --timeout <secs>   Seconds to wait for the backend before granting locally (default {})\n\
           --latency <secs>   Simulated backend response time (default {})\n\
           --offline          Simulated backend never answers\n\
           --stat-clock       Use the common stat clock recipe instead of a collection upgrade",
        DEFAULT_DATA_DIR,
        PanelConfig::default().response_timeout.as_secs_f32(),
        client::DEFAULT_BACKEND_LATENCY.as_secs_f32(),
    );
    std::process::exit(0);
}

fn parse_secs(flag: &str, raw: Option<String>) -> Result<Duration> {
    let raw = raw.ok_or_else(|| eyre!("{flag} requires a number of seconds"))?;
    let secs = raw
        .parse::<f64>()
        .map_err(|_| eyre!("{flag} expects seconds, got {raw}"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| eyre!("{flag} must be a non-negative duration"))
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut data_dir: Option<String> = None;
    let mut catalog_path: Option<String> = None;
    let mut panel = PanelConfig::default();
    let mut recipe = Recipe::CollectionUpgrade;
    let mut backend_latency = client::DEFAULT_BACKEND_LATENCY;
    let mut offline = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--data-dir requires a path argument"))?;
                if data_dir.is_some() {
                    return Err(eyre!("--data-dir may only be specified once"));
                }
                data_dir = Some(dir);
            }
            "--catalog" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--catalog requires a path argument"))?;
                if catalog_path.is_some() {
                    return Err(eyre!("--catalog may only be specified once"));
                }
                catalog_path = Some(path);
            }
            "--timeout" => panel.response_timeout = parse_secs("--timeout", args.next())?,
            "--latency" => backend_latency = parse_secs("--latency", args.next())?,
            "--offline" => offline = true,
            "--stat-clock" => recipe = Recipe::CommonStatClock,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let expand = |raw: &str| PathBuf::from(shellexpand::tilde(raw).into_owned());
    Ok(client::AppConfig {
        data_dir: expand(data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)),
        catalog_path: catalog_path.as_deref().map(expand),
        panel,
        recipe,
        backend_latency,
        offline,
    })
}

fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| eyre!("Failed to install tracing subscriber: {err}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    init_tracing(&app_config.log_dir())?;
    tracing::info!(recipe = ?app_config.recipe, offline = app_config.offline, "starting collection-crafting client");
    client::run_app(app_config).await
}
