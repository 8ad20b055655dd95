// wll_exporter - Poller and Prometheus metrics exporter for Davis WeatherLink Live
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;
use wll_exporter::client::WeatherLinkClient;
use wll_exporter::config::{StationConfig, DEFAULT_SOIL_TRANSMITTER, DEFAULT_WEATHER_TRANSMITTER};
use wll_exporter::http::RequestContext;
use wll_exporter::metrics::WeatherMetrics;
use wll_exporter::poller::{JsonLinesSink, Poller};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9783);
const DEFAULT_POLL_SECS: u64 = 10;
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const METRICS_PREFIX: &str = "wll";

#[derive(Debug, Parser)]
#[clap(name = "wll_exporter", version = clap::crate_version!())]
struct WllExporterApplication {
    /// Hostname or IP address of the WeatherLink Live on the local network
    #[clap(long)]
    host: Option<String>,

    /// Poll the WeatherLink Live at this interval, in seconds. The device can't be polled
    /// more often than every 10 seconds, smaller values are raised to 10.
    #[clap(long, default_value_t = DEFAULT_POLL_SECS)]
    poll_interval: u64,

    /// Transmitter ID (1-8) that weather readings are taken from by default
    #[clap(long, default_value_t = DEFAULT_WEATHER_TRANSMITTER)]
    weather_transmitter_id: u8,

    /// Transmitter ID (1-8) that soil temperature and moisture readings are taken from by default
    #[clap(long, default_value_t = DEFAULT_SOIL_TRANSMITTER)]
    soil_transmitter_id: u8,

    /// Whitespace separated `group:id` pairs assigning groups of readings to other
    /// transmitters, e.g. 'rain:1 wind:4 soil1:3'
    #[clap(long)]
    mappings: Option<String>,

    /// Label describing the station hardware, used only for logging
    #[clap(long)]
    hardware: Option<String>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for fetching current conditions from the WeatherLink Live, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to bind to. By default, wll_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = WllExporterApplication::parse();
    // Records go to stdout so logs must go elsewhere
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(io::stderr)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let config = StationConfig {
        host: opts.host.clone(),
        poll_interval: Duration::from_secs(opts.poll_interval),
        weather_transmitter_id: opts.weather_transmitter_id,
        soil_transmitter_id: opts.soil_transmitter_id,
        mappings: opts.mappings.clone(),
        hardware: opts.hardware.clone(),
    };

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = WeatherLinkClient::new(http_client, config.service_url());
    let mut registry = Registry::with_prefix(METRICS_PREFIX);
    let metrics = WeatherMetrics::new(&mut registry);
    let mut poller = Poller::from_config(client, &config);
    let mut sink = (JsonLinesSink::new(io::stdout()), metrics);

    tokio::spawn(async move {
        tracing::info!(
            message = "station polling started",
            url = %config.service_url(),
            hardware = ?config.hardware_name(),
            interval_secs = poller.poll_interval().as_secs(),
        );

        poller.run(&mut sink).await;
    });

    let context = Arc::new(RequestContext::new(registry));
    let handler = wll_exporter::http::text_metrics(context);
    let server = axum::Server::try_bind(&opts.bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
            process::exit(1)
        })
        .serve(handler.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        });

    tracing::info!(message = "server started", address = %opts.bind);
    server.await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
