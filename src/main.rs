use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skybridge::broker::ConnectionManager;
use skybridge::config::Config;
use skybridge::ingest::IngestListener;
use skybridge::location::{
    FixRequest, FixedLocationProvider, LastFix, LocationError, LocationProvider,
};
use skybridge::notify::{ForwardingFlag, NotificationRelay};
use skybridge::pipeline::ForwardingPipeline;
use skybridge::surface::StateSurface;
use skybridge::weather::{OpenWeatherMap, WeatherSampler};

#[derive(Debug, Parser)]
#[command(
    name = "skybridge",
    about = "Bridge device notifications and weather samples onto an MQTT broker"
)]
struct Args {
    /// Config file path (default: <config dir>/skybridge/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "skybridge=debug").
    #[arg(long, default_value = "info")]
    log: String,

    /// Start with notification forwarding enabled.
    #[arg(long)]
    forward_notifications: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    let manager = Arc::new(ConnectionManager::new());
    let flag = ForwardingFlag::new(args.forward_notifications);
    let surface = StateSurface::new(manager.monitor(), flag.clone());
    let pipeline = Arc::new(ForwardingPipeline::new(
        Arc::clone(&manager),
        config.topics.clone(),
        surface.clone(),
    ));
    let fix = LastFix::default();

    manager.connect(&config.broker);
    acquire_initial_fix(&config, &fix).await;

    let sampler = build_sampler(&config, &fix, &pipeline)?;
    if let Some(sampler) = &sampler {
        sampler.start(Duration::from_millis(config.weather.interval_ms));
    }

    let ingest = if config.ingest.enabled {
        let relay = Arc::new(NotificationRelay::new(Arc::clone(&pipeline), flag.clone()));
        let listener = IngestListener::new(relay, flag.clone(), fix.clone(), surface.clone());
        let socket_path = config.ingest.resolve_socket_path();
        Some(
            listener
                .bind(&socket_path)
                .with_context(|| format!("binding ingest socket at {}", socket_path.display()))?,
        )
    } else {
        None
    };

    // Mirror the status projection into the log on every connectivity change.
    let mut monitor = manager.monitor();
    let status_surface = surface.clone();
    let status_task = tokio::spawn(async move {
        while monitor.changed().await.is_some() {
            tracing::info!("\n{}", status_surface.render_text());
        }
    });

    wait_for_shutdown().await?;

    // Producers stop first so no timer fires into a torn-down session.
    if let Some(sampler) = &sampler {
        sampler.stop();
    }
    if let Some(ingest) = ingest {
        ingest.shutdown().await;
    }
    manager.teardown().await;
    status_task.abort();

    tracing::info!(
        published = pipeline.published_count(),
        dropped = pipeline.dropped_count(),
        "Bridge stopped"
    );
    Ok(())
}

/// Seed the last-fix store from the configured fixed coordinate, if any.
/// Without one, the weather sampler idles until a fix arrives over the
/// ingest socket.
async fn acquire_initial_fix(config: &Config, fix: &LastFix) {
    let Some(provider) = FixedLocationProvider::from_config(&config.location) else {
        tracing::info!(
            "No fixed location configured; weather sampling idles until a fix arrives via the ingest socket"
        );
        return;
    };

    let request = FixRequest::from_config(&config.location);
    match provider.current_fix(&request).await {
        Ok(coordinate) => {
            fix.set(coordinate);
            tracing::info!(
                latitude = coordinate.latitude,
                longitude = coordinate.longitude,
                "Initial location fix acquired"
            );
        }
        Err(LocationError::PermissionDenied) => {
            tracing::error!(
                "Location permission denied; weather sampling idles until a fix is provided"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "Initial location fix failed");
        }
    }
}

fn build_sampler(
    config: &Config,
    fix: &LastFix,
    pipeline: &Arc<ForwardingPipeline>,
) -> anyhow::Result<Option<WeatherSampler>> {
    if !config.weather.enabled {
        tracing::info!("Weather sampling disabled by configuration");
        return Ok(None);
    }

    let Some(api_key) = config.weather.resolve_api_key() else {
        tracing::warn!(
            "Weather sampling disabled: no API key configured \
             (set weather.api_key or OPEN_WEATHER_MAP_API_KEY)"
        );
        return Ok(None);
    };

    let provider = OpenWeatherMap::new(config.weather.base_url.clone(), api_key)
        .context("building weather client")?;
    Ok(Some(WeatherSampler::new(
        Arc::new(provider),
        fix.clone(),
        Arc::clone(pipeline),
    )))
}

async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
