//! KxLink Daemon - keeps a KX-180 mixer under host control.
//!
//! Connects to the mixer, acquires the remote-control lock, applies the
//! configured startup state and then mirrors everything the panel reports
//! until it is told to stop.

use std::sync::Arc;

use anyhow::{Context, Result};
use kxlink_core::MixerEvent;
use kxlink_hid::{HidapiBackend, Mixer};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod signals;
mod store;

use config::StartupConfig;
use store::ParameterStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::config_path()?;
    let config = config::load_from(&config_path)?;

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = config.daemon.log_filter(rust_log.as_deref());
    let filter = EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter: {directives}"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting KxLink daemon");
    info!(path = %config_path.display(), found = config_path.exists(), "Configuration loaded");

    let mixer_config = config.mixer_config()?;
    info!(
        handshake_frames = mixer_config.handshake.len(),
        eq_encoding = ?mixer_config.eq_encoding,
        "Session configured"
    );

    let mixer = Arc::new(Mixer::new(Arc::new(HidapiBackend::new()), mixer_config));
    let store = Arc::new(ParameterStore::new());
    let mut events = mixer.subscribe();

    mixer.connect().context("Failed to connect to the KX-180")?;
    mixer.initialize().await.context("Failed to acquire the hardware lock")?;

    apply_startup(&mixer, &store, &config.startup)?;

    let mut shutdown_rx = signals::setup_signal_handlers();
    info!("KxLink daemon running");

    loop {
        tokio::select! {
            Some(signal) = shutdown_rx.recv() => {
                info!(signal, "Shutting down");
                break;
            }

            event = events.recv() => {
                match event {
                    Ok(MixerEvent::ParameterChanged(change)) => {
                        if store.apply(&change) != Some(change.value) {
                            info!(parameter = %change.parameter, value = %change.value, "Panel change");
                        }
                    }
                    Ok(MixerEvent::TransportFault { message }) => {
                        error!(%message, "Lost the mixer");
                        break;
                    }
                    Ok(MixerEvent::Locked) => debug!("Lock re-established"),
                    Ok(MixerEvent::Released) => {
                        warn!("Session released");
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    mixer.close();

    match serde_json::to_string(&store.snapshot()) {
        Ok(state) => debug!(%state, "Last known mixer state"),
        Err(e) => warn!(error = %e, "Could not serialize mixer state"),
    }
    info!(parameters = store.len(), "KxLink daemon stopped");
    Ok(())
}

/// Write the configured startup state.
fn apply_startup(mixer: &Mixer, store: &ParameterStore, startup: &StartupConfig) -> Result<()> {
    for (parameter, value) in startup.parameters()? {
        match mixer.set_parameter(parameter, value) {
            Ok(()) => {
                store.record(parameter, value);
            }
            Err(e) => warn!(%parameter, error = %e, "Startup parameter rejected"),
        }
    }

    if let Some(index) = startup.preset {
        let preset = mixer.recall_preset(index).context("Failed to recall startup preset")?;
        info!(index, label = preset.label().unwrap_or("P01"), "Startup preset scheduled");
    }

    if startup.diagnostic_pulse {
        mixer.start_diagnostic_pulse()?;
    }
    Ok(())
}
