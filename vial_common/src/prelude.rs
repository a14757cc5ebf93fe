//! Prelude module for common re-exports.
//!
//! ```rust
//! use vial_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, EngineConfig, LogLevel, SharedConfig};

// ─── Geometry ───────────────────────────────────────────────────────
pub use crate::types::{DeckPoint, Mount, MovementAxis, Offset, WellLocation, WellOrigin};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::hal::driver::{HardwareError, PipettingHardware};
pub use crate::hal::labware::{LabwareError, LabwareProvider};

// ─── Pipettes ───────────────────────────────────────────────────────
pub use crate::nozzle::{NozzleLayout, NozzleMap};
