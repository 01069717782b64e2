// src/gate/mod.rs
//
// Scene-stability gate.
//
// Signal flow:
//   Frame → MotionSampleSource (registration) → TranspositionHistory
//         → StabilityMetric → StabilityGate → GateDecision
//                                            ├→ DispatchRequest (detector)
//                                            └→ PresentationEvent (sink)

mod history;
mod stability;
mod state_machine;

pub use history::TranspositionHistory;
pub use stability::StabilityMetric;
pub use state_machine::{
    DispatchCompletion, DispatchRequest, DispatchTicket, GateDecision, GateState, GateStats,
    StabilityGate,
};
