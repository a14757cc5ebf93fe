//! Workspace-wide constants.
//!
//! Single source of truth for grid sizes, tolerances and default names.

/// Columns of the canonical 96-well grid.
pub const SBS_COLUMNS: usize = 12;

/// Rows of the canonical 96-well grid.
pub const SBS_ROWS: usize = 8;

/// Absolute tolerance (µL) used when comparing fluid volumes.
pub const VOLUME_TOLERANCE: f64 = 1e-9;

/// Liquid id reserved for wells declared empty.
pub const EMPTY_LIQUID_ID: &str = "EMPTY";

/// Config file name inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Driver used when the config names none.
pub const DEFAULT_DRIVER: &str = "simulation";

/// Default liquid class schema version.
pub const DEFAULT_LIQUID_CLASS_VERSION: u32 = 1;
