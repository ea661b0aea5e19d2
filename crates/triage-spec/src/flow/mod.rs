mod command;
mod controller;
pub(crate) mod state;

pub use command::{FlowCommand, IgnoreReason, Outcome};
pub use controller::FlowController;
pub use state::{Direction, PendingStop, StepState, StopReason, StopTrigger};
