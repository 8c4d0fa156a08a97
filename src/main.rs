use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use frostwatch_client::ApiClient;
use frostwatch_poll::{DeviceTelemetryPoller, FaultLogPaginator, FaultQuery, StatusFeed};
use frostwatch_types::{format_value, FleetSnapshot};

mod settings;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "frostwatch")]
#[command(about = "Fleet monitor for industrial refrigeration and drying controllers")]
struct Cli {
    /// Path to a frostwatch.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current fleet status once
    Status,
    /// Continuously watch the fleet and one device's telemetry
    Watch {
        /// Device name as configured in [[devices]]
        device: String,
    },
    /// Print one page of a device's fault log
    Faults {
        /// Device name as configured in [[devices]]
        device: String,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Filter by tag name
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    let client = Arc::new(
        ApiClient::builder()
            .base_url(&settings.base_url)
            .timeout(settings.timeout())
            .build(),
    );

    match cli.command {
        Command::Status => status_once(client).await,
        Command::Watch { device } => watch(client, &settings, device).await,
        Command::Faults {
            device,
            page,
            search,
        } => faults_once(client, &settings, device, page, search).await,
    }
}

async fn status_once(client: Arc<ApiClient>) -> Result<()> {
    let feed = StatusFeed::new(client);
    feed.refresh().await;

    if let Some(error) = feed.last_error() {
        anyhow::bail!(error);
    }
    print_snapshot(&feed.snapshot());
    Ok(())
}

async fn watch(client: Arc<ApiClient>, settings: &Settings, device: String) -> Result<()> {
    let registry = Arc::new(settings.registry());
    if registry.table_name(&device).is_none() {
        anyhow::bail!("device '{device}' is not in the configured registry");
    }

    let mut feed = StatusFeed::new(client.clone()).interval(settings.status_interval());
    feed.start();

    let mut poller = DeviceTelemetryPoller::new(client, registry, feed.handle(), device.clone())
        .interval(settings.telemetry_interval());
    poller.start();

    println!("watching {device}, ctrl-c to stop");
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_snapshot(&feed.snapshot());
                print_reading(&poller);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    poller.stop();
    feed.stop();
    Ok(())
}

async fn faults_once(
    client: Arc<ApiClient>,
    settings: &Settings,
    device: String,
    page: u64,
    search: Option<String>,
) -> Result<()> {
    let registry = Arc::new(settings.registry());

    let mut query = FaultQuery::new(device);
    query.page = page;
    query.search = search;

    let paginator = FaultLogPaginator::new(client, registry, query);
    paginator.refresh().await;

    if let Some(error) = paginator.error() {
        anyhow::bail!(error);
    }

    let view = paginator.view();
    println!(
        "page {}/{} ({} records, {} active)",
        view.stats.current_page, view.stats.total_pages, view.stats.total, view.stats.active_tags
    );
    for record in &view.records {
        let state = if record.is_active { "ACTIVE" } else { "clear" };
        println!("{:6}  {:30}  {}", state, record.tag, record.created_at);
    }
    Ok(())
}

fn print_snapshot(snapshot: &FleetSnapshot) {
    println!(
        "fleet: {} devices  running={}  cooling={}  online={}",
        snapshot.len(),
        snapshot.all_running,
        snapshot.all_cooling,
        snapshot.all_online
    );
    for entry in &snapshot.entries {
        println!(
            "  {:20}  running={}  cooling={}  online={}",
            entry.device_name, entry.is_running, entry.is_cooling, entry.is_online
        );
    }
}

fn print_reading(poller: &DeviceTelemetryPoller) {
    let reading = poller.reading();
    if reading.is_empty() {
        if let Some(error) = poller.error() {
            println!("{}: {error}", poller.device());
        } else {
            println!("{}: no data (not running)", poller.device());
        }
        return;
    }
    println!("{}:", poller.device());
    for (field, value) in &reading {
        println!("  {:30} {}", field, format_value(value, ""));
    }
}
