// src/lib.rs
//
// Scene-stability gated object detection.
//
// Signal flow:
//   FrameSource → PipelineOrchestrator ─→ StabilityGate ─┬→ DetectionDispatcher → ObjectDetector
//                       ↑                                 │          │
//                       └──────── DispatchCompletion ─────┼──────────┘
//                                                         └→ PresentationEvent → PresentationSink

pub mod config;
pub mod detection;
pub mod frame_source;
pub mod gate;
pub mod pipeline;
pub mod registration;
pub mod types;

pub use gate::{GateDecision, GateState, StabilityGate, TranspositionHistory};
pub use registration::{BlockMatchRegistration, MotionSampleSource, RegistrationError};
pub use types::{Config, Detection, Frame, FrameHandle, GrayFrame, TranslationSample};
