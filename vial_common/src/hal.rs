//! Consumed collaborator interfaces.
//!
//! - [`driver`] - Async pipetting hardware surface and its error type
//! - [`labware`] - Labware and deck geometry provider

pub mod driver;
pub mod labware;
