//! Server assembly and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use chorale::{MidiParams, ReferenceLibrary, ReferenceTemplate};
use choraleconf::ChoraleConfig;
use tracing::{info, warn};

use crate::artifact::{ArtifactSink, FileSink, NullSink};
use crate::web::{router, AppState};

/// Rendering parameters from the `[harmony]` section.
pub fn midi_params(config: &ChoraleConfig) -> MidiParams {
    let harmony = &config.harmony;
    MidiParams {
        ticks_per_beat: harmony.ticks_per_beat,
        tempo_us_per_beat: harmony.tempo_us_per_beat,
        melody_program: harmony.melody_program,
        harmony_program: harmony.harmony_program,
        harmony_velocity: harmony.harmony_velocity,
        ..MidiParams::default()
    }
}

/// Built-in templates plus those declared under `[references]`.
///
/// A configured id replaces the built-in template with the same id.
pub fn reference_library(config: &ChoraleConfig) -> Result<ReferenceLibrary> {
    let mut library = ReferenceLibrary::builtin();
    for (id, reference) in &config.references {
        let points = reference
            .points()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid reference template {}", id))?;
        let template =
            ReferenceTemplate::new(id.as_str(), &reference.name, &reference.description, points);
        if library.insert(template).is_some() {
            info!(reference_id = %id, "configured reference replaces built-in");
        }
    }
    Ok(library)
}

pub fn artifact_sink(config: &ChoraleConfig) -> Arc<dyn ArtifactSink> {
    if config.harmony.persist_artifacts {
        Arc::new(FileSink::new(&config.paths.output_dir))
    } else {
        Arc::new(NullSink)
    }
}

/// Shared handler state for a loaded configuration.
pub fn app_state(config: &ChoraleConfig) -> Result<AppState> {
    Ok(
        AppState::new(midi_params(config), reference_library(config)?)
            .with_sink(artifact_sink(config))
            .with_placeholder_url(&config.harmony.placeholder_url),
    )
}

/// Bind and serve until SIGINT or SIGTERM.
pub async fn run(config: ChoraleConfig) -> Result<()> {
    info!("chorale starting");

    let state = app_state(&config)?;
    info!(
        references = state.references.len(),
        persist_artifacts = config.harmony.persist_artifacts,
        output_dir = %config.paths.output_dir.display(),
        "state ready"
    );

    let app = router(state);

    let addr = config.bind.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("chorale ready on http://{}", addr);
    info!("   Harmonize: POST http://{}/api/v1/harmonize", addr);
    info!("   Evaluate:  POST http://{}/api/v1/evaluate", addr);
    info!("   Health:    GET http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
