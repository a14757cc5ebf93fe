//! # Vial HAL Library
//!
//! Pluggable hardware drivers behind the `PipettingHardware` trait defined in
//! `vial_common::hal::driver`, plus a TOML-described simulated deck that
//! implements `LabwareProvider`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`deck`] - Simulated labware and addressable areas
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      vial_hal                             │
//! │  ┌──────────────────┐        ┌────────────────────────┐   │
//! │  │ Driver Registry  │──────► │  PipettingHardware     │   │
//! │  │ (name → factory) │        │  (trait object)        │   │
//! │  └──────────────────┘        └────────────────────────┘   │
//! │  ┌──────────────────┐                                     │
//! │  │  SimulatedDeck   │──────► LabwareProvider              │
//! │  └──────────────────┘                                     │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod deck;
pub mod driver_registry;
pub mod drivers;

pub use crate::deck::{DeckConfig, LabwareConfig, SimulatedDeck};
pub use crate::driver_registry::DriverRegistry;
