//! Simulated deck.
//!
//! Labware and addressable areas described in TOML, exposed through the
//! `LabwareProvider` trait. Wells sit on a regular grid whose A1 top center
//! is `origin`; rows run toward the front (decreasing y), columns toward the
//! right (increasing x).
//!
//! # TOML Example
//!
//! ```toml
//! [[labware]]
//! id = "plate"
//! load_name = "corning_96_wellplate_360ul_flat"
//! rows = 8
//! columns = 12
//! origin = { x = 14.38, y = 74.24, z = 14.22 }
//! well_depth = 10.67
//! well_shape = { shape = "circular", diameter = 6.86 }
//!
//! [[addressable_areas]]
//! name = "A3"
//! center = { x = 400.0, y = 350.0, z = 0.0 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use vial_common::config::{ConfigError, ConfigLoader};
use vial_common::hal::labware::{
    AddressableArea, LabwareError, LabwareInfo, LabwareProvider, WellGeometry, WellShape,
};
use vial_common::types::DeckPoint;

/// Largest grid the simulated deck builds (384-well plate).
const MAX_ROWS: usize = 16;
const MAX_COLUMNS: usize = 24;

/// One labware entry of `deck.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabwareConfig {
    /// Labware id used by commands.
    pub id: String,
    /// Definition load name.
    pub load_name: String,
    /// Well rows.
    pub rows: usize,
    /// Well columns.
    pub columns: usize,
    /// Top center of well A1.
    pub origin: DeckPoint,
    /// Center-to-center distance along x.
    #[serde(default = "default_spacing")]
    pub spacing_x: f64,
    /// Center-to-center distance along y.
    #[serde(default = "default_spacing")]
    pub spacing_y: f64,
    /// Well depth.
    pub well_depth: f64,
    /// Well cross-section.
    pub well_shape: WellShape,
    /// Tip rack flag.
    #[serde(default)]
    pub is_tiprack: bool,
    /// Tip length for tip racks.
    #[serde(default)]
    pub tip_length: Option<f64>,
    /// Definition quirks.
    #[serde(default)]
    pub quirks: Vec<String>,
}

fn default_spacing() -> f64 {
    9.0
}

impl LabwareConfig {
    /// Flat 96-well plate.
    pub fn plate_96(id: &str, origin: DeckPoint) -> Self {
        Self {
            id: id.to_string(),
            load_name: "corning_96_wellplate_360ul_flat".to_string(),
            rows: 8,
            columns: 12,
            origin,
            spacing_x: 9.0,
            spacing_y: 9.0,
            well_depth: 10.67,
            well_shape: WellShape::Circular { diameter: 6.86 },
            is_tiprack: false,
            tip_length: None,
            quirks: Vec::new(),
        }
    }

    /// 384-well plate.
    pub fn plate_384(id: &str, origin: DeckPoint) -> Self {
        Self {
            load_name: "corning_384_wellplate_112ul_flat".to_string(),
            rows: 16,
            columns: 24,
            spacing_x: 4.5,
            spacing_y: 4.5,
            well_depth: 11.56,
            well_shape: WellShape::Rectangular {
                x_dimension: 3.63,
                y_dimension: 3.63,
            },
            ..Self::plate_96(id, origin)
        }
    }

    /// 12-column reservoir.
    pub fn reservoir_12(id: &str, origin: DeckPoint) -> Self {
        Self {
            load_name: "nest_12_reservoir_15ml".to_string(),
            rows: 1,
            columns: 12,
            well_depth: 39.22,
            well_shape: WellShape::Rectangular {
                x_dimension: 8.2,
                y_dimension: 71.2,
            },
            quirks: vec!["centerMultichannelOnWells".to_string()],
            ..Self::plate_96(id, origin)
        }
    }

    /// Single-well reservoir.
    pub fn reservoir_1(id: &str, origin: DeckPoint) -> Self {
        Self {
            load_name: "nest_1_reservoir_195ml".to_string(),
            rows: 1,
            columns: 1,
            well_depth: 26.85,
            well_shape: WellShape::Rectangular {
                x_dimension: 106.8,
                y_dimension: 71.2,
            },
            quirks: vec![
                "centerMultichannelOnWells".to_string(),
                "touchTipDisabled".to_string(),
            ],
            ..Self::plate_96(id, origin)
        }
    }

    /// 96-tip rack.
    pub fn tiprack_96(id: &str, origin: DeckPoint, tip_length: f64) -> Self {
        Self {
            load_name: "opentrons_flex_96_tiprack_50ul".to_string(),
            well_depth: 97.47,
            well_shape: WellShape::Circular { diameter: 5.58 },
            is_tiprack: true,
            tip_length: Some(tip_length),
            ..Self::plate_96(id, origin)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "labware id cannot be empty".to_string(),
            ));
        }
        if self.rows == 0 || self.rows > MAX_ROWS || self.columns == 0 || self.columns > MAX_COLUMNS
        {
            return Err(ConfigError::ValidationError(format!(
                "labware {}: grid {}x{} out of range",
                self.id, self.rows, self.columns
            )));
        }
        if self.well_depth <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "labware {}: well_depth must be positive",
                self.id
            )));
        }
        if self.is_tiprack && self.tip_length.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "labware {}: tip rack needs tip_length",
                self.id
            )));
        }
        Ok(())
    }
}

/// Contents of `deck.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Loaded labware.
    #[serde(default)]
    pub labware: Vec<LabwareConfig>,
    /// Areas in the deck configuration.
    #[serde(default)]
    pub addressable_areas: Vec<AddressableArea>,
}

struct SimulatedLabware {
    info: LabwareInfo,
    config: LabwareConfig,
    /// Well name to (row, column).
    index: HashMap<String, (usize, usize)>,
}

/// `LabwareProvider` backed by a [`DeckConfig`].
pub struct SimulatedDeck {
    labware: HashMap<String, SimulatedLabware>,
    areas: HashMap<String, AddressableArea>,
}

impl SimulatedDeck {
    /// Build and validate a deck.
    pub fn from_config(config: DeckConfig) -> Result<Self, ConfigError> {
        let mut labware = HashMap::new();
        for entry in config.labware {
            entry.validate()?;
            let id = entry.id.clone();
            if labware.contains_key(&id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate labware id {id}"
                )));
            }
            labware.insert(id, build_labware(entry));
        }

        let mut areas = HashMap::new();
        for area in config.addressable_areas {
            if areas.contains_key(&area.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate addressable area {}",
                    area.name
                )));
            }
            areas.insert(area.name.clone(), area);
        }

        info!(
            "Simulated deck: {} labware, {} addressable areas",
            labware.len(),
            areas.len()
        );
        Ok(Self { labware, areas })
    }

    /// Load a deck from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_config(DeckConfig::load(path)?)
    }
}

fn well_name(row: usize, column: usize) -> String {
    format!("{}{}", char::from(b'A' + row as u8), column + 1)
}

fn build_labware(config: LabwareConfig) -> SimulatedLabware {
    let mut index = HashMap::new();
    let wells_by_column = (0..config.columns)
        .map(|c| {
            (0..config.rows)
                .map(|r| {
                    let name = well_name(r, c);
                    index.insert(name.clone(), (r, c));
                    name
                })
                .collect()
        })
        .collect();

    SimulatedLabware {
        info: LabwareInfo {
            id: config.id.clone(),
            load_name: config.load_name.clone(),
            is_tiprack: config.is_tiprack,
            tip_length: config.tip_length,
            quirks: config.quirks.clone(),
            wells_by_column,
        },
        config,
        index,
    }
}

impl LabwareProvider for SimulatedDeck {
    fn labware(&self, labware_id: &str) -> Result<&LabwareInfo, LabwareError> {
        self.labware
            .get(labware_id)
            .map(|l| &l.info)
            .ok_or_else(|| LabwareError::LabwareNotFound(labware_id.to_string()))
    }

    fn well(&self, labware_id: &str, well_name: &str) -> Result<WellGeometry, LabwareError> {
        let labware = self
            .labware
            .get(labware_id)
            .ok_or_else(|| LabwareError::LabwareNotFound(labware_id.to_string()))?;
        let (row, column) =
            labware
                .index
                .get(well_name)
                .copied()
                .ok_or_else(|| LabwareError::WellNotFound {
                    labware_id: labware_id.to_string(),
                    well_name: well_name.to_string(),
                })?;
        let cfg = &labware.config;
        Ok(WellGeometry {
            top: DeckPoint::new(
                cfg.origin.x + column as f64 * cfg.spacing_x,
                cfg.origin.y - row as f64 * cfg.spacing_y,
                cfg.origin.z,
            ),
            depth: cfg.well_depth,
            shape: cfg.well_shape,
        })
    }

    fn addressable_area(&self, name: &str) -> Result<&AddressableArea, LabwareError> {
        self.areas
            .get(name)
            .ok_or_else(|| LabwareError::AddressableAreaNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> SimulatedDeck {
        SimulatedDeck::from_config(DeckConfig {
            labware: vec![
                LabwareConfig::plate_96("plate", DeckPoint::new(10.0, 80.0, 15.0)),
                LabwareConfig::reservoir_12("res", DeckPoint::new(200.0, 80.0, 40.0)),
            ],
            addressable_areas: vec![AddressableArea {
                name: "A3".into(),
                center: DeckPoint::new(400.0, 350.0, 0.0),
                staging_slot: false,
            }],
        })
        .unwrap()
    }

    #[test]
    fn wells_are_grouped_by_column() {
        let deck = deck();
        let plate = deck.labware("plate").unwrap();
        assert_eq!(plate.wells_by_column.len(), 12);
        assert_eq!(plate.wells_by_column[0][0], "A1");
        assert_eq!(plate.wells_by_column[0][7], "H1");
        assert_eq!(plate.wells_by_column[11][7], "H12");

        let res = deck.labware("res").unwrap();
        assert_eq!(res.wells_by_column[3], vec!["A4".to_string()]);
    }

    #[test]
    fn well_positions_follow_grid() {
        let deck = deck();
        let b2 = deck.well("plate", "B2").unwrap();
        assert_eq!(b2.top, DeckPoint::new(19.0, 71.0, 15.0));
        assert_eq!(b2.bottom().z, 15.0 - 10.67);
    }

    #[test]
    fn lookups_fail_cleanly() {
        let deck = deck();
        assert!(matches!(
            deck.labware("nope"),
            Err(LabwareError::LabwareNotFound(_))
        ));
        assert!(matches!(
            deck.well("plate", "Z1"),
            Err(LabwareError::WellNotFound { .. })
        ));
        assert!(matches!(
            deck.addressable_area("D4"),
            Err(LabwareError::AddressableAreaNotFound(_))
        ));
        assert!(deck.addressable_area("A3").is_ok());
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_grids() {
        let dup = DeckConfig {
            labware: vec![
                LabwareConfig::plate_96("p", DeckPoint::default()),
                LabwareConfig::plate_96("p", DeckPoint::default()),
            ],
            addressable_areas: vec![],
        };
        assert!(matches!(
            SimulatedDeck::from_config(dup),
            Err(ConfigError::ValidationError(_))
        ));

        let mut bad = LabwareConfig::plate_96("p", DeckPoint::default());
        bad.rows = 0;
        assert!(SimulatedDeck::from_config(DeckConfig {
            labware: vec![bad],
            addressable_areas: vec![],
        })
        .is_err());

        let mut rack = LabwareConfig::tiprack_96("t", DeckPoint::default(), 57.9);
        rack.tip_length = None;
        assert!(SimulatedDeck::from_config(DeckConfig {
            labware: vec![rack],
            addressable_areas: vec![],
        })
        .is_err());
    }

    #[test]
    fn big_plate_names_reach_p24() {
        let deck = SimulatedDeck::from_config(DeckConfig {
            labware: vec![LabwareConfig::plate_384("p384", DeckPoint::default())],
            addressable_areas: vec![],
        })
        .unwrap();
        let info = deck.labware("p384").unwrap();
        assert_eq!(info.wells_by_column[23][15], "P24");
    }
}
