//! The asset lifecycle: state machine, failure taxonomy, confirmed file
//! moves, and the coordinator that sequences them.

mod coordinator;
mod failure;
pub mod relocate;
mod state;

pub use coordinator::{Collaborators, Coordinator};
pub use failure::Failure;
pub use relocate::{
    delete_confirmed, relocate, relocate_numbered, relocate_to, write_numbered, RelocationError,
};
pub use state::{Asset, AssetKind, InvalidTransition, LifecycleState, TerminalState};
