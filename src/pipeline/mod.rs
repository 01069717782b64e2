// src/pipeline/mod.rs

pub mod dispatcher;
pub mod event_bus;
pub mod metrics;
pub mod orchestrator;

pub use dispatcher::DetectionDispatcher;
pub use event_bus::{
    presentation_channel, run_presentation, JsonlSink, LogSink, PresentationEvent,
    PresentationSink, TeeSink,
};
pub use metrics::{MetricsSummary, PipelineMetrics};
pub use orchestrator::{PipelineCommand, PipelineOrchestrator};
