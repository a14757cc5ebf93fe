//! # Vial Engine Library
//!
//! Command execution core of the vial liquid-handling robot. Commands are
//! queued on a [`ProtocolEngine`], run one at a time against a
//! `PipettingHardware` collaborator, and each produces a state update the
//! engine applies once the command is terminal.
//!
//! # Module Structure
//!
//! - [`command`] - Command model, params, results and implementations
//! - [`engine`] - Queue, recovery gate, stop handling and state ownership
//! - [`error`] - Defined errors, unclassified errors, error occurrences
//! - [`geometry`] - Well positions, liquid heights and motion waypoints
//! - [`resources`] - Id and clock sources
//! - [`state`] - Engine state stores and the state update record
//! - [`well_math`] - Which wells a nozzle layout covers
//!
//! ## Outcome Model
//!
//! Every command returns `Result<Execution<T>, EngineError>`:
//!
//! 1. **Success** - public result plus state update
//! 2. **DefinedError** - recoverable failure plus state update and a
//!    false-positive alternative
//! 3. **Err** - unclassified failure; no state changes

pub mod command;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod resources;
pub mod state;
pub mod well_math;

pub use command::context::EngineSettings;
pub use command::{Command, CommandCreate, CommandIntent, CommandParams, CommandStatus};
pub use engine::{PendingRecovery, ProtocolEngine, StopHandle};
pub use error::{DefinedError, EngineError, ErrorOccurrence, RecoveryAction};
pub use state::EngineState;
