// src/main.rs

use anyhow::{Context, Result};
use scene_gate::detection::RemoteDetector;
use scene_gate::frame_source::FrameSource;
use scene_gate::pipeline::{
    presentation_channel, run_presentation, JsonlSink, LogSink, PipelineCommand, PipelineMetrics,
    PipelineOrchestrator, TeeSink,
};
use scene_gate::{BlockMatchRegistration, Config};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("📷 Scene gate starting");
    info!("✓ Configuration loaded from {}", config_path);

    let source = FrameSource::open(&config.frames)?;
    if source.is_empty() {
        error!("No frame images found in {}", config.frames.input_dir);
        return Ok(());
    }

    std::fs::create_dir_all(&config.frames.output_dir).with_context(|| {
        format!("Failed to create output dir {}", config.frames.output_dir)
    })?;
    let events_path = Path::new(&config.frames.output_dir).join("events.jsonl");
    let sink = TeeSink::new(LogSink, JsonlSink::create(&events_path)?);

    let detector = Arc::new(RemoteDetector::new(&config.detection)?);
    let registration = BlockMatchRegistration::new(config.registration.clone());
    let metrics = PipelineMetrics::new();

    let (presentation_tx, presentation_rx) =
        presentation_channel(config.pipeline.presentation_queue);
    let presenter = tokio::spawn(run_presentation(presentation_rx, sink));

    let orchestrator = PipelineOrchestrator::new(
        &config,
        registration,
        detector,
        presentation_tx,
        metrics,
    );

    let (frame_tx, frame_rx) = mpsc::channel(config.pipeline.frame_queue);
    let (command_tx, command_rx) = mpsc::channel(4);
    let feeder = tokio::spawn(source.feed(frame_tx));
    let pipeline = tokio::spawn(orchestrator.run(frame_rx, command_rx));

    // Ctrl-C stops capture; the pipeline then drains and exits
    let interrupt = tokio::spawn({
        let feeder_abort = feeder.abort_handle();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping capture");
                let _ = command_tx.send(PipelineCommand::Stop).await;
                feeder_abort.abort();
            }
        }
    });

    let summary = pipeline.await.context("Pipeline task failed")??;
    interrupt.abort();

    match feeder.await {
        Ok(result) => {
            result?;
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e).context("Frame source task failed"),
    }

    let applied = presenter.await.context("Presentation task failed")??;

    info!("\n✓ Run complete");
    info!("  Frames processed: {}", summary.total_frames);
    info!("  Registration failures: {}", summary.registration_failures);
    info!("  Stable frames: {}", summary.stable_frames);
    info!("  Detections dispatched: {}", summary.dispatches);
    info!(
        "  Detection failures: {} ({} timeouts)",
        summary.detection_failures, summary.detection_timeouts
    );
    info!("  Result sets shown: {}", summary.results_shown);
    info!("  Presentation events: {}", applied);
    info!("  Processing Speed: {:.1} FPS", summary.fps);
    info!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
