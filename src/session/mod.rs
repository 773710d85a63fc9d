//! One composition's runtime: lifecycle states, progress forwarding and the render loop.

/// Percent-complete forwarding.
pub mod progress;
/// Fixed-cadence render loop.
pub mod render_loop;
/// Lifecycle state machine.
pub mod state;

pub use progress::ProgressReporter;
pub use render_loop::{LoopOutcome, RenderLoop};
pub use state::{CompositionState, StateMachine};
