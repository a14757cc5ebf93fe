//! Vial Common Library
//!
//! Shared types, configuration loading and collaborator traits for every
//! crate of the vial workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Grid sizes, tolerances, default names
//! - [`hal`] - Pipetting hardware and labware provider interfaces
//! - [`liquid_class`] - Liquid class definition schema
//! - [`logging`] - Tracing subscriber setup
//! - [`nozzle`] - Nozzle layouts and maps
//! - [`types`] - Deck points and well locations
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! vial = { package = "vial_common", path = "../vial_common" }
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod liquid_class;
pub mod logging;
pub mod nozzle;
pub mod prelude;
pub mod types;
