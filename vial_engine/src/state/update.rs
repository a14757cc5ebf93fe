//! State updates.
//!
//! A [`StateUpdate`] is a bundle of independent per-domain deltas produced
//! by command execution. Every field defaults to [`FieldUpdate::Unchanged`];
//! two updates merge with [`StateUpdate::reduce`], later non-`Unchanged`
//! fields winning.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use vial_common::hal::driver::PipetteSpec;
use vial_common::liquid_class::LiquidClassRecord;
use vial_common::nozzle::NozzleMap;
use vial_common::types::DeckPoint;

use super::fluid_stack::AspiratedFluid;
use super::labware::LabwareLocation;
use super::modules::ModuleModel;
use super::pipettes::{AttachedTip, LocationTarget};

// ─── Field Deltas ───────────────────────────────────────────────────

/// Three-state delta for one updatable field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<T> {
    /// Nothing to do.
    Unchanged,
    /// Actively remove the current value.
    Clear,
    /// Replace with a value.
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl<T> FieldUpdate<T> {
    /// True for `Unchanged`.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// Right-biased merge: `later` wins unless it is `Unchanged`.
    pub fn merge(self, later: Self) -> Self {
        match later {
            Self::Unchanged => self,
            other => other,
        }
    }

    /// Value of a `Set`.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// A value or the explicit "now unknown" marker inside an update payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueOrClear<T> {
    /// Known value.
    Value(T),
    /// Value is no longer known.
    Clear,
}

impl<T> ValueOrClear<T> {
    /// `None` for `Clear`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Clear => None,
        }
    }
}

impl<T> From<Option<T>> for ValueOrClear<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Value)
    }
}

// ─── Payloads ───────────────────────────────────────────────────────

/// New logical and physical location of a pipette.
#[derive(Debug, Clone, PartialEq)]
pub struct PipetteLocationUpdate {
    /// Pipette that moved.
    pub pipette_id: String,
    /// Well or area it is now at; `None` after a raw coordinate move.
    pub new_location: Option<LocationTarget>,
    /// Critical point after the move.
    pub new_deck_point: DeckPoint,
}

/// A pipette entered the run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPipetteUpdate {
    /// Assigned id.
    pub pipette_id: String,
    /// Physical description.
    pub spec: PipetteSpec,
}

/// Replacement nozzle map.
#[derive(Debug, Clone, PartialEq)]
pub struct PipetteNozzleMapUpdate {
    /// Pipette.
    pub pipette_id: String,
    /// New active nozzles.
    pub nozzle_map: NozzleMap,
}

/// Tip attached or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct PipetteTipStateUpdate {
    /// Pipette.
    pub pipette_id: String,
    /// `None` once the tip is gone.
    pub tip: Option<AttachedTip>,
}

/// How the fluid inside a tip changed.
#[derive(Debug, Clone, PartialEq)]
pub enum FluidChange {
    /// Fluid drawn in.
    Aspirated(AspiratedFluid),
    /// Volume pushed out (µL).
    Ejected(f64),
    /// Tip emptied completely.
    Empty,
    /// Contents can no longer be known.
    Unknown,
}

/// Change to the fluid stack of a pipette.
#[derive(Debug, Clone, PartialEq)]
pub struct PipetteFluidUpdate {
    /// Pipette.
    pub pipette_id: String,
    /// What happened.
    pub change: FluidChange,
}

/// Declared starting volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidLoadedUpdate {
    /// Labware.
    pub labware_id: String,
    /// Well name to volume.
    pub volumes: BTreeMap<String, ValueOrClear<f64>>,
    /// Declaration time.
    pub last_loaded: DateTime<Utc>,
}

/// Result of a liquid level probe.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidProbedUpdate {
    /// Labware.
    pub labware_id: String,
    /// Probed well.
    pub well_name: String,
    /// Liquid height above the well bottom.
    pub height: ValueOrClear<f64>,
    /// Volume derived from the height.
    pub volume: ValueOrClear<f64>,
    /// Probe time.
    pub last_probed: DateTime<Utc>,
}

/// Liquid added to or removed from wells.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidOperatedUpdate {
    /// Labware.
    pub labware_id: String,
    /// Every well touched by the active nozzles.
    pub well_names: Vec<String>,
    /// Signed per-well delta, or `Clear` when unknown.
    pub volume_added: ValueOrClear<f64>,
}

/// Liquid class stored under an id.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidClassLoadedUpdate {
    /// Assigned id.
    pub liquid_class_id: String,
    /// Stored record.
    pub record: LiquidClassRecord,
}

/// Module entered the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleLoadedUpdate {
    /// Assigned id.
    pub module_id: String,
    /// Module model.
    pub model: ModuleModel,
    /// Deck slot.
    pub location: String,
}

/// Absorbance reader lid moved.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsorbanceReaderLidUpdate {
    /// Reader.
    pub module_id: String,
    /// Lid is on the reader.
    pub is_lid_on: bool,
}

/// Gripper set labware down somewhere new.
#[derive(Debug, Clone, PartialEq)]
pub struct LabwareLocationUpdate {
    /// Labware.
    pub labware_id: String,
    /// Where it now sits.
    pub new_location: LabwareLocation,
}

// ─── StateUpdate ────────────────────────────────────────────────────

/// Every change one command makes to engine state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateUpdate {
    /// Pipette location; `Clear` forgets every pipette's location.
    pub pipette_location: FieldUpdate<PipetteLocationUpdate>,
    /// Newly loaded pipette.
    pub loaded_pipette: FieldUpdate<LoadPipetteUpdate>,
    /// Nozzle configuration.
    pub pipette_nozzle_map: FieldUpdate<PipetteNozzleMapUpdate>,
    /// Tip attachment.
    pub pipette_tip_state: FieldUpdate<PipetteTipStateUpdate>,
    /// In-tip fluid.
    pub pipette_aspirated_fluid: FieldUpdate<PipetteFluidUpdate>,
    /// Declared well volumes.
    pub liquid_loaded: FieldUpdate<LiquidLoadedUpdate>,
    /// Probed well height and volume.
    pub liquid_probed: FieldUpdate<LiquidProbedUpdate>,
    /// Well volume deltas.
    pub liquid_operated: FieldUpdate<LiquidOperatedUpdate>,
    /// Liquid class storage.
    pub liquid_class_loaded: FieldUpdate<LiquidClassLoadedUpdate>,
    /// Newly loaded module.
    pub module_loaded: FieldUpdate<ModuleLoadedUpdate>,
    /// Absorbance reader lid.
    pub absorbance_reader_lid: FieldUpdate<AbsorbanceReaderLidUpdate>,
    /// Labware moved by the gripper.
    pub labware_location: FieldUpdate<LabwareLocationUpdate>,
}

impl StateUpdate {
    /// Empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field carries a change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge `later` on top of `self`, field by field.
    pub fn reduce(self, later: StateUpdate) -> StateUpdate {
        StateUpdate {
            pipette_location: self.pipette_location.merge(later.pipette_location),
            loaded_pipette: self.loaded_pipette.merge(later.loaded_pipette),
            pipette_nozzle_map: self.pipette_nozzle_map.merge(later.pipette_nozzle_map),
            pipette_tip_state: self.pipette_tip_state.merge(later.pipette_tip_state),
            pipette_aspirated_fluid: self
                .pipette_aspirated_fluid
                .merge(later.pipette_aspirated_fluid),
            liquid_loaded: self.liquid_loaded.merge(later.liquid_loaded),
            liquid_probed: self.liquid_probed.merge(later.liquid_probed),
            liquid_operated: self.liquid_operated.merge(later.liquid_operated),
            liquid_class_loaded: self.liquid_class_loaded.merge(later.liquid_class_loaded),
            module_loaded: self.module_loaded.merge(later.module_loaded),
            absorbance_reader_lid: self
                .absorbance_reader_lid
                .merge(later.absorbance_reader_lid),
            labware_location: self.labware_location.merge(later.labware_location),
        }
    }

    /// Merge a sequence of updates left to right.
    pub fn reduce_all(updates: impl IntoIterator<Item = StateUpdate>) -> StateUpdate {
        updates
            .into_iter()
            .fold(StateUpdate::new(), StateUpdate::reduce)
    }

    /// Pipette is now at a well or addressable area.
    pub fn set_pipette_location(
        mut self,
        pipette_id: &str,
        target: LocationTarget,
        deck_point: DeckPoint,
    ) -> Self {
        self.pipette_location = FieldUpdate::Set(PipetteLocationUpdate {
            pipette_id: pipette_id.to_string(),
            new_location: Some(target),
            new_deck_point: deck_point,
        });
        self
    }

    /// Pipette is at a deck point that is not a well or area.
    pub fn set_pipette_position(mut self, pipette_id: &str, deck_point: DeckPoint) -> Self {
        self.pipette_location = FieldUpdate::Set(PipetteLocationUpdate {
            pipette_id: pipette_id.to_string(),
            new_location: None,
            new_deck_point: deck_point,
        });
        self
    }

    /// Forget the location of every pipette.
    pub fn clear_all_pipette_locations(mut self) -> Self {
        self.pipette_location = FieldUpdate::Clear;
        self
    }

    /// Register a pipette.
    pub fn set_load_pipette(mut self, pipette_id: &str, spec: PipetteSpec) -> Self {
        self.loaded_pipette = FieldUpdate::Set(LoadPipetteUpdate {
            pipette_id: pipette_id.to_string(),
            spec,
        });
        self
    }

    /// Replace a pipette's nozzle map.
    pub fn update_pipette_nozzle(mut self, pipette_id: &str, nozzle_map: NozzleMap) -> Self {
        self.pipette_nozzle_map = FieldUpdate::Set(PipetteNozzleMapUpdate {
            pipette_id: pipette_id.to_string(),
            nozzle_map,
        });
        self
    }

    /// Attach or remove a tip.
    pub fn update_pipette_tip_state(mut self, pipette_id: &str, tip: Option<AttachedTip>) -> Self {
        self.pipette_tip_state = FieldUpdate::Set(PipetteTipStateUpdate {
            pipette_id: pipette_id.to_string(),
            tip,
        });
        self
    }

    fn set_fluid(mut self, pipette_id: &str, change: FluidChange) -> Self {
        self.pipette_aspirated_fluid = FieldUpdate::Set(PipetteFluidUpdate {
            pipette_id: pipette_id.to_string(),
            change,
        });
        self
    }

    /// Fluid drawn into the tip.
    pub fn set_fluid_aspirated(self, pipette_id: &str, fluid: AspiratedFluid) -> Self {
        self.set_fluid(pipette_id, FluidChange::Aspirated(fluid))
    }

    /// Volume pushed out of the tip.
    pub fn set_fluid_ejected(self, pipette_id: &str, volume: f64) -> Self {
        self.set_fluid(pipette_id, FluidChange::Ejected(volume))
    }

    /// Tip emptied.
    pub fn set_fluid_empty(self, pipette_id: &str) -> Self {
        self.set_fluid(pipette_id, FluidChange::Empty)
    }

    /// Tip contents unknown.
    pub fn set_fluid_unknown(self, pipette_id: &str) -> Self {
        self.set_fluid(pipette_id, FluidChange::Unknown)
    }

    /// Declare well volumes.
    pub fn set_liquid_loaded(
        mut self,
        labware_id: &str,
        volumes: BTreeMap<String, ValueOrClear<f64>>,
        last_loaded: DateTime<Utc>,
    ) -> Self {
        self.liquid_loaded = FieldUpdate::Set(LiquidLoadedUpdate {
            labware_id: labware_id.to_string(),
            volumes,
            last_loaded,
        });
        self
    }

    /// Record a probe result.
    pub fn set_liquid_probed(
        mut self,
        labware_id: &str,
        well_name: &str,
        height: ValueOrClear<f64>,
        volume: ValueOrClear<f64>,
        last_probed: DateTime<Utc>,
    ) -> Self {
        self.liquid_probed = FieldUpdate::Set(LiquidProbedUpdate {
            labware_id: labware_id.to_string(),
            well_name: well_name.to_string(),
            height,
            volume,
            last_probed,
        });
        self
    }

    /// Add or remove liquid from wells.
    pub fn set_liquid_operated(
        mut self,
        labware_id: &str,
        well_names: Vec<String>,
        volume_added: ValueOrClear<f64>,
    ) -> Self {
        self.liquid_operated = FieldUpdate::Set(LiquidOperatedUpdate {
            labware_id: labware_id.to_string(),
            well_names,
            volume_added,
        });
        self
    }

    /// Store a liquid class.
    pub fn set_liquid_class_loaded(
        mut self,
        liquid_class_id: &str,
        record: LiquidClassRecord,
    ) -> Self {
        self.liquid_class_loaded = FieldUpdate::Set(LiquidClassLoadedUpdate {
            liquid_class_id: liquid_class_id.to_string(),
            record,
        });
        self
    }

    /// Register a module.
    pub fn set_module_loaded(mut self, module_id: &str, model: ModuleModel, location: &str) -> Self {
        self.module_loaded = FieldUpdate::Set(ModuleLoadedUpdate {
            module_id: module_id.to_string(),
            model,
            location: location.to_string(),
        });
        self
    }

    /// Absorbance reader lid position.
    pub fn set_absorbance_reader_lid(mut self, module_id: &str, is_lid_on: bool) -> Self {
        self.absorbance_reader_lid = FieldUpdate::Set(AbsorbanceReaderLidUpdate {
            module_id: module_id.to_string(),
            is_lid_on,
        });
        self
    }

    /// Labware now sits at `new_location`.
    pub fn set_labware_location(mut self, labware_id: &str, new_location: LabwareLocation) -> Self {
        self.labware_location = FieldUpdate::Set(LabwareLocationUpdate {
            labware_id: labware_id.to_string(),
            new_location,
        });
        self
    }
}
