pub mod state;

pub use state::{TriggerCallback, TriggerState, TriggerStateMachine};
