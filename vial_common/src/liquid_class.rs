//! Liquid class definitions.
//!
//! Serde model of the versioned on-disk liquid class document
//! (`byPipette[].byTipType[].{aspirate, singleDispense, multiDispense}`)
//! and the per-(pipette, tip rack) [`LiquidClassRecord`] the engine stores.
//!
//! Unset optional fields are skipped on output, so a definition read from
//! disk serializes back to the same document.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::types::Offset;

/// Errors reading or querying liquid class data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiquidClassError {
    /// No definition file for the requested name/version.
    #[error("No definition found for liquid class '{0}'")]
    DefinitionDoesNotExist(String),

    /// Definition file is not valid JSON for the schema.
    #[error("Failed to parse liquid class definition: {0}")]
    ParseError(String),

    /// Volumes are never negative.
    #[error("Volume must be non-negative, got {0}")]
    NegativeVolume(f64),

    /// Deleting a breakpoint that was never set.
    #[error("No value set for volume {0}")]
    VolumeNotFound(f64),
}

// ─── Enumerations ───────────────────────────────────────────────────

/// Reference point for submerge/retract/dispense positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionReference {
    /// Bottom of the well.
    WellBottom,
    /// Top of the well.
    WellTop,
    /// Center of the well.
    WellCenter,
    /// Liquid surface.
    LiquidMeniscus,
}

/// Where a blowout happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlowoutLocation {
    /// Source well.
    Source,
    /// Destination well.
    Destination,
    /// Trash.
    Trash,
}

// ─── Volume Curves ──────────────────────────────────────────────────

/// A numeric property that depends on the handled volume.
///
/// On disk: `{"default": 50, "10": 40, "50": 60}`. Explicit breakpoints are
/// interpolated linearly; volumes outside the breakpoint range take the
/// nearest breakpoint's value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidHandlingPropertyByVolume {
    default: f64,
    /// Sorted by volume, no duplicates.
    breakpoints: Vec<(f64, f64)>,
}

impl LiquidHandlingPropertyByVolume {
    /// Curve with only a default value.
    pub fn new(default: f64) -> Self {
        Self {
            default,
            breakpoints: Vec::new(),
        }
    }

    /// Default value.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Explicit `(volume, value)` breakpoints, sorted by volume.
    pub fn breakpoints(&self) -> &[(f64, f64)] {
        &self.breakpoints
    }

    /// Value for a volume.
    ///
    /// Exact breakpoints return their value; anything else is linearly
    /// interpolated and clamped to the ends. A curve without breakpoints
    /// returns its default.
    pub fn get_for_volume(&self, volume: f64) -> Result<f64, LiquidClassError> {
        ensure_non_negative(volume)?;
        let points = &self.breakpoints;
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Ok(self.default);
        };
        if volume <= first.0 {
            return Ok(first.1);
        }
        if volume >= last.0 {
            return Ok(last.1);
        }
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if volume == x0 {
                return Ok(y0);
            }
            if volume < x1 {
                return Ok(y0 + (y1 - y0) * (volume - x0) / (x1 - x0));
            }
        }
        Ok(last.1)
    }

    /// Set or replace the value at a breakpoint.
    pub fn set_for_volume(&mut self, volume: f64, value: f64) -> Result<(), LiquidClassError> {
        ensure_non_negative(volume)?;
        match self
            .breakpoints
            .binary_search_by(|(v, _)| v.total_cmp(&volume))
        {
            Ok(i) => self.breakpoints[i].1 = value,
            Err(i) => self.breakpoints.insert(i, (volume, value)),
        }
        Ok(())
    }

    /// Remove a breakpoint.
    pub fn delete_for_volume(&mut self, volume: f64) -> Result<(), LiquidClassError> {
        match self
            .breakpoints
            .binary_search_by(|(v, _)| v.total_cmp(&volume))
        {
            Ok(i) => {
                self.breakpoints.remove(i);
                Ok(())
            }
            Err(_) => Err(LiquidClassError::VolumeNotFound(volume)),
        }
    }
}

fn ensure_non_negative(volume: f64) -> Result<(), LiquidClassError> {
    if volume < 0.0 {
        return Err(LiquidClassError::NegativeVolume(volume));
    }
    Ok(())
}

fn volume_key(volume: f64) -> String {
    if volume.fract() == 0.0 && volume.abs() < 1e15 {
        format!("{}", volume as i64)
    } else {
        format!("{volume}")
    }
}

impl Serialize for LiquidHandlingPropertyByVolume {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = BTreeMap::new();
        map.insert("default".to_string(), self.default);
        for (volume, value) in &self.breakpoints {
            map.insert(volume_key(*volume), *value);
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LiquidHandlingPropertyByVolume {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let mut default = None;
        let mut breakpoints = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            if key == "default" {
                default = Some(value);
                continue;
            }
            let volume: f64 = key
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid volume key '{key}'")))?;
            if volume < 0.0 {
                return Err(D::Error::custom(format!("negative volume key '{key}'")));
            }
            breakpoints.push((volume, value));
        }
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        let default = default.ok_or_else(|| D::Error::missing_field("default"))?;
        Ok(Self {
            default,
            breakpoints,
        })
    }
}

// ─── Property Groups ────────────────────────────────────────────────

/// Delay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayParams {
    /// Seconds.
    pub duration: f64,
}

/// Optional delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayProperties {
    /// Whether the delay runs.
    pub enable: bool,
    /// Parameters, present when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<DelayParams>,
}

/// Touch-tip parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchTipParams {
    /// Height offset from the well top.
    pub z_offset: f64,
    /// Distance kept from the well edge.
    pub mm_to_edge: f64,
    /// Speed in mm/s.
    pub speed: f64,
}

/// Optional touch tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchTipProperties {
    /// Whether touch tip runs.
    pub enable: bool,
    /// Parameters, present when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<TouchTipParams>,
}

/// Mix parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixParams {
    /// Number of aspirate/dispense cycles.
    pub repetitions: u32,
    /// Volume per cycle in µL.
    pub volume: f64,
}

/// Optional mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixProperties {
    /// Whether mixing runs.
    pub enable: bool,
    /// Parameters, present when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<MixParams>,
}

/// Blowout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowoutParams {
    /// Where to blow out.
    pub location: BlowoutLocation,
    /// Flow rate in µL/s.
    pub flow_rate: f64,
}

/// Optional blowout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlowoutProperties {
    /// Whether blowout runs.
    pub enable: bool,
    /// Parameters, present when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BlowoutParams>,
}

/// Movement into the liquid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submerge {
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// Start position of the submerge.
    pub offset: Offset,
    /// Speed in mm/s.
    pub speed: f64,
    /// Delay after submerging.
    pub delay: DelayProperties,
}

/// Movement out of the source well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractAspirate {
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// End position of the retract.
    pub offset: Offset,
    /// Speed in mm/s.
    pub speed: f64,
    /// Air gap taken after retracting.
    pub air_gap_by_volume: LiquidHandlingPropertyByVolume,
    /// Touch tip after retracting.
    pub touch_tip: TouchTipProperties,
    /// Delay after retracting.
    pub delay: DelayProperties,
}

/// Movement out of the destination well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractDispense {
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// End position of the retract.
    pub offset: Offset,
    /// Speed in mm/s.
    pub speed: f64,
    /// Air gap taken after retracting.
    pub air_gap_by_volume: LiquidHandlingPropertyByVolume,
    /// Touch tip after retracting.
    pub touch_tip: TouchTipProperties,
    /// Blowout after retracting.
    pub blowout: BlowoutProperties,
    /// Delay after retracting.
    pub delay: DelayProperties,
}

/// Aspirate physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateProperties {
    /// Approach.
    pub submerge: Submerge,
    /// Exit.
    pub retract: RetractAspirate,
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// Aspirate position.
    pub offset: Offset,
    /// Flow rate in µL/s.
    pub flow_rate_by_volume: LiquidHandlingPropertyByVolume,
    /// Pre-wet the tip before the first aspirate.
    pub pre_wet: bool,
    /// Mix before aspirating.
    pub mix: MixProperties,
    /// Delay after aspirating.
    pub delay: DelayProperties,
}

/// Single-dispense physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleDispenseProperties {
    /// Approach.
    pub submerge: Submerge,
    /// Exit.
    pub retract: RetractDispense,
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// Dispense position.
    pub offset: Offset,
    /// Flow rate in µL/s.
    pub flow_rate_by_volume: LiquidHandlingPropertyByVolume,
    /// Mix after dispensing.
    pub mix: MixProperties,
    /// Extra plunger travel after dispensing.
    pub push_out_by_volume: LiquidHandlingPropertyByVolume,
    /// Delay after dispensing.
    pub delay: DelayProperties,
}

/// Multi-dispense physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDispenseProperties {
    /// Approach.
    pub submerge: Submerge,
    /// Exit.
    pub retract: RetractDispense,
    /// Reference for `offset`.
    pub position_reference: PositionReference,
    /// Dispense position.
    pub offset: Offset,
    /// Flow rate in µL/s.
    pub flow_rate_by_volume: LiquidHandlingPropertyByVolume,
    /// Extra volume aspirated to condition the tip.
    pub conditioning_by_volume: LiquidHandlingPropertyByVolume,
    /// Extra volume discarded at the end.
    pub disposal_by_volume: LiquidHandlingPropertyByVolume,
    /// Delay after each dispense.
    pub delay: DelayProperties,
}

// ─── Document ───────────────────────────────────────────────────────

/// Properties for one tip rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByTipTypeSetting {
    /// Tip rack load name.
    pub tiprack: String,
    /// Aspirate properties.
    pub aspirate: AspirateProperties,
    /// Single-dispense properties.
    pub single_dispense: SingleDispenseProperties,
    /// Multi-dispense properties, if supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_dispense: Option<MultiDispenseProperties>,
}

/// Properties for one pipette model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByPipetteSetting {
    /// Pipette model name.
    pub pipette_model: String,
    /// Per-tip-rack settings.
    pub by_tip_type: Vec<ByTipTypeSetting>,
}

/// Version 1 liquid class document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidClassSchemaV1 {
    /// Machine name.
    pub liquid_class_name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Schema version.
    pub schema_version: u32,
    /// Definition namespace.
    pub namespace: String,
    /// Per-pipette settings.
    pub by_pipette: Vec<ByPipetteSetting>,
}

impl LiquidClassSchemaV1 {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, LiquidClassError> {
        serde_json::from_str(text).map_err(|e| LiquidClassError::ParseError(e.to_string()))
    }

    /// Record for a pipette model and tip rack, if the class defines one.
    pub fn record_for(&self, pipette_model: &str, tiprack: &str) -> Option<LiquidClassRecord> {
        self.by_pipette
            .iter()
            .filter(|p| p.pipette_model == pipette_model)
            .flat_map(|p| p.by_tip_type.iter())
            .find(|t| t.tiprack == tiprack)
            .map(|t| LiquidClassRecord {
                liquid_class_name: self.liquid_class_name.clone(),
                pipette_model: pipette_model.to_string(),
                tiprack: t.tiprack.clone(),
                aspirate: t.aspirate.clone(),
                single_dispense: t.single_dispense.clone(),
                multi_dispense: t.multi_dispense.clone(),
            })
    }
}

/// Transfer physics for one (pipette model, tip rack) pair.
///
/// Immutable once stored by the engine; equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidClassRecord {
    /// Liquid class name.
    pub liquid_class_name: String,
    /// Pipette model name.
    pub pipette_model: String,
    /// Tip rack load name.
    pub tiprack: String,
    /// Aspirate properties.
    pub aspirate: AspirateProperties,
    /// Single-dispense properties.
    pub single_dispense: SingleDispenseProperties,
    /// Multi-dispense properties, if supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_dispense: Option<MultiDispenseProperties>,
}

/// Load `<dir>/<version>/<name>.json`.
pub fn load_definition(
    dir: &Path,
    name: &str,
    version: u32,
) -> Result<LiquidClassSchemaV1, LiquidClassError> {
    let path = dir.join(version.to_string()).join(format!("{name}.json"));
    let text = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LiquidClassError::DefinitionDoesNotExist(name.to_string())
        } else {
            LiquidClassError::ParseError(e.to_string())
        }
    })?;
    LiquidClassSchemaV1::from_json(&text)
}
