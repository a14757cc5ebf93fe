//! Pipette sub-store.
//!
//! Loaded pipettes, their nozzle maps, attached tips, fluid contents and
//! the engine's belief about where they are.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use vial_common::hal::driver::PipetteSpec;
use vial_common::nozzle::NozzleMap;
use vial_common::types::DeckPoint;

use super::fluid_stack::{FluidKind, FluidStack};
use super::update::{FieldUpdate, FluidChange, StateUpdate};

/// Logical place a pipette was last moved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LocationTarget {
    /// A well of some labware.
    #[serde(rename_all = "camelCase")]
    Well {
        /// Labware.
        labware_id: String,
        /// Well.
        well_name: String,
    },
    /// A named deck area.
    #[serde(rename_all = "camelCase")]
    AddressableArea {
        /// Area name.
        addressable_area_name: String,
    },
}

/// The single pipette with a logical location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLocation {
    /// Pipette.
    pub pipette_id: String,
    /// Where it is.
    pub target: LocationTarget,
}

/// Tip on a pipette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedTip {
    /// Length in mm.
    pub length: f64,
}

/// What the engine knows about the inside of a tip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "stack", rename_all = "camelCase")]
pub enum PipetteContents {
    /// Tracked segment by segment.
    Known(FluidStack),
    /// A fault made the contents indeterminate.
    Unknown,
}

/// Loaded pipette.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPipette {
    /// Engine id.
    pub id: String,
    /// Physical description.
    pub spec: PipetteSpec,
}

/// Pipette sub-store state.
#[derive(Debug, Clone, Default)]
pub struct PipetteState {
    pipettes: HashMap<String, LoadedPipette>,
    nozzle_maps: HashMap<String, NozzleMap>,
    tips: HashMap<String, Option<AttachedTip>>,
    contents: HashMap<String, PipetteContents>,
    deck_points: HashMap<String, DeckPoint>,
    current_location: Option<CurrentLocation>,
}

impl PipetteState {
    /// Apply the pipette fields of an update.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let FieldUpdate::Set(load) = &update.loaded_pipette {
            self.pipettes.insert(
                load.pipette_id.clone(),
                LoadedPipette {
                    id: load.pipette_id.clone(),
                    spec: load.spec.clone(),
                },
            );
            self.tips.insert(load.pipette_id.clone(), None);
            self.contents.insert(
                load.pipette_id.clone(),
                PipetteContents::Known(FluidStack::new()),
            );
        }

        if let FieldUpdate::Set(nozzles) = &update.pipette_nozzle_map {
            self.nozzle_maps
                .insert(nozzles.pipette_id.clone(), nozzles.nozzle_map.clone());
        }

        match &update.pipette_location {
            FieldUpdate::Unchanged => {}
            FieldUpdate::Clear => {
                self.current_location = None;
                self.deck_points.clear();
            }
            FieldUpdate::Set(loc) => {
                self.current_location = loc.new_location.clone().map(|target| CurrentLocation {
                    pipette_id: loc.pipette_id.clone(),
                    target,
                });
                self.deck_points
                    .insert(loc.pipette_id.clone(), loc.new_deck_point);
            }
        }

        if let FieldUpdate::Set(tip) = &update.pipette_tip_state {
            self.tips.insert(tip.pipette_id.clone(), tip.tip);
        }

        if let FieldUpdate::Set(fluid) = &update.pipette_aspirated_fluid {
            let contents = self
                .contents
                .entry(fluid.pipette_id.clone())
                .or_insert(PipetteContents::Known(FluidStack::new()));
            match (&fluid.change, contents) {
                (FluidChange::Empty, contents) => {
                    *contents = PipetteContents::Known(FluidStack::new());
                }
                (FluidChange::Unknown, contents) => *contents = PipetteContents::Unknown,
                (FluidChange::Aspirated(added), PipetteContents::Known(stack)) => {
                    stack.add_fluid(*added);
                }
                (FluidChange::Ejected(volume), PipetteContents::Known(stack)) => {
                    stack.remove_fluid(*volume);
                }
                (_, PipetteContents::Unknown) => {
                    debug!(pipette_id = %fluid.pipette_id, "Fluid change on unknown contents ignored");
                }
            }
        }
    }

    /// Loaded pipette by id.
    pub fn get(&self, pipette_id: &str) -> Option<&LoadedPipette> {
        self.pipettes.get(pipette_id)
    }

    /// Every loaded pipette.
    pub fn get_all(&self) -> impl Iterator<Item = &LoadedPipette> {
        self.pipettes.values()
    }

    /// Active nozzle map.
    pub fn nozzle_map(&self, pipette_id: &str) -> Option<&NozzleMap> {
        self.nozzle_maps.get(pipette_id)
    }

    /// Attached tip, if any.
    pub fn attached_tip(&self, pipette_id: &str) -> Option<AttachedTip> {
        self.tips.get(pipette_id).copied().flatten()
    }

    /// Pipette with a logical location, if any.
    pub fn current_location(&self) -> Option<&CurrentLocation> {
        self.current_location.as_ref()
    }

    /// Well the pipette is sitting in, if its last move was to a well.
    pub fn current_well(&self, pipette_id: &str) -> Option<(&str, &str)> {
        match &self.current_location {
            Some(CurrentLocation {
                pipette_id: id,
                target:
                    LocationTarget::Well {
                        labware_id,
                        well_name,
                    },
            }) if id == pipette_id => Some((labware_id, well_name)),
            _ => None,
        }
    }

    /// Last known deck point.
    pub fn deck_point(&self, pipette_id: &str) -> Option<DeckPoint> {
        self.deck_points.get(pipette_id).copied()
    }

    /// Fluid contents of the tip.
    pub fn contents(&self, pipette_id: &str) -> Option<&PipetteContents> {
        self.contents.get(pipette_id)
    }

    /// True once a fault made the tip contents indeterminate.
    pub fn fluid_unknown(&self, pipette_id: &str) -> bool {
        matches!(self.contents.get(pipette_id), Some(PipetteContents::Unknown))
    }

    /// Total volume in the tip; `None` when unknown or not loaded.
    pub fn aspirated_volume(&self, pipette_id: &str) -> Option<f64> {
        self.fluid_stack(pipette_id)
            .map(|stack| stack.aspirated_volume(None))
    }

    /// Liquid volume in the tip; `None` when unknown or not loaded.
    pub fn aspirated_liquid(&self, pipette_id: &str) -> Option<f64> {
        self.fluid_stack(pipette_id)
            .map(|stack| stack.aspirated_volume(Some(FluidKind::Liquid)))
    }

    /// Liquid part of the next `volume` µL dispensed; `None` when unknown.
    pub fn liquid_part_of_dispense(&self, pipette_id: &str, volume: f64) -> Option<f64> {
        self.fluid_stack(pipette_id)
            .map(|stack| stack.liquid_part_of_dispense_volume(volume))
    }

    fn fluid_stack(&self, pipette_id: &str) -> Option<&FluidStack> {
        match self.contents.get(pipette_id) {
            Some(PipetteContents::Known(stack)) => Some(stack),
            _ => None,
        }
    }
}
