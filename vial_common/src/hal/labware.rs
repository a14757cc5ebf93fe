//! Labware and deck geometry provider.
//!
//! The engine never mutates labware; it asks a [`LabwareProvider`] for
//! well layouts, well geometry and addressable areas.

use crate::types::DeckPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors looking up labware or deck data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabwareError {
    /// Unknown labware id.
    #[error("Labware not found: {0}")]
    LabwareNotFound(String),

    /// Well not part of the labware.
    #[error("Well {well_name} not found in labware {labware_id}")]
    WellNotFound {
        /// Labware id.
        labware_id: String,
        /// Requested well.
        well_name: String,
    },

    /// Area not part of the deck configuration.
    #[error("Addressable area not in deck configuration: {0}")]
    AddressableAreaNotFound(String),
}

/// Labware quirk that forbids touch tip.
pub const QUIRK_TOUCH_TIP_DISABLED: &str = "touchTipDisabled";

/// Static description of one loaded labware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabwareInfo {
    /// Labware id.
    pub id: String,
    /// Definition load name.
    pub load_name: String,
    /// True for tip racks.
    pub is_tiprack: bool,
    /// Tip length for tip racks.
    pub tip_length: Option<f64>,
    /// Definition quirks.
    pub quirks: Vec<String>,
    /// Well names grouped by column, each column ordered back to front.
    pub wells_by_column: Vec<Vec<String>>,
}

impl LabwareInfo {
    /// Whether the definition carries a quirk.
    pub fn has_quirk(&self, quirk: &str) -> bool {
        self.quirks.iter().any(|q| q == quirk)
    }
}

/// Cross-section of a well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum WellShape {
    /// Round well.
    Circular {
        /// Diameter in mm.
        diameter: f64,
    },
    /// Square or rectangular well.
    Rectangular {
        /// Size along x in mm.
        x_dimension: f64,
        /// Size along y in mm.
        y_dimension: f64,
    },
}

/// Position and shape of one well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellGeometry {
    /// Center of the top opening.
    pub top: DeckPoint,
    /// Depth in mm.
    pub depth: f64,
    /// Cross-section.
    pub shape: WellShape,
}

impl WellGeometry {
    /// Center of the well bottom.
    pub fn bottom(&self) -> DeckPoint {
        DeckPoint::new(self.top.x, self.top.y, self.top.z - self.depth)
    }

    /// Geometric center.
    pub fn center(&self) -> DeckPoint {
        DeckPoint::new(self.top.x, self.top.y, self.top.z - self.depth / 2.0)
    }

    /// Cross-section area in mm², which equals µL per mm of height.
    pub fn cross_section_area(&self) -> f64 {
        match self.shape {
            WellShape::Circular { diameter } => std::f64::consts::PI * (diameter / 2.0).powi(2),
            WellShape::Rectangular {
                x_dimension,
                y_dimension,
            } => x_dimension * y_dimension,
        }
    }

    /// Half extents along x and y.
    pub fn half_extents(&self) -> (f64, f64) {
        match self.shape {
            WellShape::Circular { diameter } => (diameter / 2.0, diameter / 2.0),
            WellShape::Rectangular {
                x_dimension,
                y_dimension,
            } => (x_dimension / 2.0, y_dimension / 2.0),
        }
    }
}

/// Named usable space on the deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressableArea {
    /// Area name, e.g. `A3` or `movableTrashA3`.
    pub name: String,
    /// Point the pipette moves to.
    pub center: DeckPoint,
    /// Staging slots are not reachable by pipettes.
    #[serde(default)]
    pub staging_slot: bool,
}

/// Read-only labware and deck geometry.
pub trait LabwareProvider: Send + Sync {
    /// Static labware description.
    fn labware(&self, labware_id: &str) -> Result<&LabwareInfo, LabwareError>;

    /// Geometry of a well.
    fn well(&self, labware_id: &str, well_name: &str) -> Result<WellGeometry, LabwareError>;

    /// Area present in the current deck configuration.
    fn addressable_area(&self, name: &str) -> Result<&AddressableArea, LabwareError>;
}
