//! Geometry and placement value types shared by the engine, the driver
//! and the deck provider.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Deck Coordinates ───────────────────────────────────────────────

/// Absolute position on the deck, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeckPoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl DeckPoint {
    /// Build a point from its coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point shifted by an offset.
    pub fn offset_by(self, offset: Offset) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
            z: self.z + offset.z,
        }
    }

    /// Point shifted along a single axis.
    pub fn moved_along(self, axis: MovementAxis, distance: f64) -> Self {
        match axis {
            MovementAxis::X => Self { x: self.x + distance, ..self },
            MovementAxis::Y => Self { y: self.y + distance, ..self },
            MovementAxis::Z => Self { z: self.z + distance, ..self },
        }
    }
}

impl fmt::Display for DeckPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Relative displacement in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    /// X displacement.
    pub x: f64,
    /// Y displacement.
    pub y: f64,
    /// Z displacement.
    pub z: f64,
}

impl Offset {
    /// Build an offset from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis for a relative gantry move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAxis {
    /// Left/right.
    X,
    /// Front/back.
    Y,
    /// Up/down.
    Z,
}

/// Pipette mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mount {
    /// Left mount.
    Left,
    /// Right mount.
    Right,
}

// ─── Well Locations ─────────────────────────────────────────────────

/// Reference point inside a well that an offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellOrigin {
    /// Top rim, centered.
    #[default]
    Top,
    /// Bottom, centered.
    Bottom,
    /// Geometric center.
    Center,
    /// Last measured liquid surface.
    Meniscus,
}

/// Marker for "offset by the volume of the current operation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationVolume {
    /// Serialized as the string `"operationVolume"`.
    #[serde(rename = "operationVolume")]
    OperationVolume,
}

/// Liquid-relative height adjustment, expressed as a volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeOffset {
    /// Signed volume in µL.
    Volume(f64),
    /// Use the volume of the operation being performed.
    Operation(OperationVolume),
}

/// Location relative to a well.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellLocation {
    /// Reference point.
    #[serde(default)]
    pub origin: WellOrigin,

    /// Displacement from the reference point.
    #[serde(default)]
    pub offset: Offset,

    /// Liquid-relative adjustment; only meaningful with a meniscus origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_offset: Option<VolumeOffset>,
}

impl WellLocation {
    /// Location at a given origin with no offset.
    pub fn at(origin: WellOrigin) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Same location with a different offset.
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    /// Same location with a volume offset.
    pub fn with_volume_offset(mut self, volume_offset: VolumeOffset) -> Self {
        self.volume_offset = Some(volume_offset);
        self
    }
}
