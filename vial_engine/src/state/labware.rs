//! Labware location sub-store.
//!
//! Only locations set by the gripper are recorded; labware never moved
//! keeps the placement given by the deck.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::update::{FieldUpdate, StateUpdate};

/// Where a piece of labware sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabwareLocation {
    /// A deck slot, e.g. `D2` or staging slot `A4`.
    DeckSlot {
        /// Slot name.
        #[serde(rename = "slotName")]
        slot_name: String,
    },
    /// On top of a loaded module.
    Module {
        /// Module id.
        #[serde(rename = "moduleId")]
        module_id: String,
    },
    /// Any named addressable area.
    AddressableArea {
        /// Area name.
        #[serde(rename = "addressableAreaName")]
        addressable_area_name: String,
    },
}

/// Labware sub-store state.
#[derive(Debug, Clone, Default)]
pub struct LabwareState {
    locations: BTreeMap<String, LabwareLocation>,
}

impl LabwareState {
    /// Apply the labware location field of an update.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let FieldUpdate::Set(moved) = &update.labware_location {
            self.locations
                .insert(moved.labware_id.clone(), moved.new_location.clone());
        }
    }

    /// Last recorded location of the labware.
    pub fn get_location(&self, labware_id: &str) -> Option<&LabwareLocation> {
        self.locations.get(labware_id)
    }

    /// Every recorded location by labware id.
    pub fn get_all(&self) -> &BTreeMap<String, LabwareLocation> {
        &self.locations
    }
}
