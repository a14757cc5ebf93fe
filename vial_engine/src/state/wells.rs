//! Well liquid sub-store.
//!
//! Tracks declared and probed liquid per (labware, well). Any aspirate or
//! dispense touching a well drops its probed height and shifts its volumes
//! by the signed delta, or forgets them when the delta is unknown.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::update::{FieldUpdate, StateUpdate, ValueOrClear};

/// Author-declared volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedVolumeInfo {
    /// Volume in µL, `None` once unknown.
    pub volume: Option<f64>,
    /// Declaration time.
    pub last_loaded: DateTime<Utc>,
    /// Liquid operations since declaration.
    pub operations_since_load: u32,
}

/// Sensor-measured height.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbedHeightInfo {
    /// Height above the well bottom in mm.
    pub height: Option<f64>,
    /// Probe time.
    pub last_probed: DateTime<Utc>,
}

/// Volume derived from a probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbedVolumeInfo {
    /// Volume in µL.
    pub volume: Option<f64>,
    /// Probe time.
    pub last_probed: DateTime<Utc>,
    /// Liquid operations since the probe.
    pub operations_since_probe: u32,
}

/// Everything known about the liquid in one well.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellLiquidInfo {
    /// Declared volume.
    pub loaded_volume: Option<LoadedVolumeInfo>,
    /// Probed height.
    pub probed_height: Option<ProbedHeightInfo>,
    /// Probed volume.
    pub probed_volume: Option<ProbedVolumeInfo>,
}

/// Flat summary of one well.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellInfoSummary {
    /// Labware.
    pub labware_id: String,
    /// Well.
    pub well_name: String,
    /// Declared volume.
    pub loaded_volume: Option<f64>,
    /// Probed volume.
    pub probed_volume: Option<f64>,
    /// Probed height.
    pub probed_height: Option<f64>,
}

type PerWell<T> = BTreeMap<String, BTreeMap<String, T>>;

/// Well sub-store state.
#[derive(Debug, Clone, Default)]
pub struct WellState {
    loaded_volumes: PerWell<LoadedVolumeInfo>,
    probed_heights: PerWell<ProbedHeightInfo>,
    probed_volumes: PerWell<ProbedVolumeInfo>,
}

impl WellState {
    /// Apply the well fields of an update.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let FieldUpdate::Set(loaded) = &update.liquid_loaded {
            let wells = self
                .loaded_volumes
                .entry(loaded.labware_id.clone())
                .or_default();
            for (well, volume) in &loaded.volumes {
                wells.insert(
                    well.clone(),
                    LoadedVolumeInfo {
                        volume: volume.into_option(),
                        last_loaded: loaded.last_loaded,
                        operations_since_load: 0,
                    },
                );
            }
        }

        if let FieldUpdate::Set(probed) = &update.liquid_probed {
            self.probed_heights
                .entry(probed.labware_id.clone())
                .or_default()
                .insert(
                    probed.well_name.clone(),
                    ProbedHeightInfo {
                        height: probed.height.into_option(),
                        last_probed: probed.last_probed,
                    },
                );
            self.probed_volumes
                .entry(probed.labware_id.clone())
                .or_default()
                .insert(
                    probed.well_name.clone(),
                    ProbedVolumeInfo {
                        volume: probed.volume.into_option(),
                        last_probed: probed.last_probed,
                        operations_since_probe: 0,
                    },
                );
        }

        if let FieldUpdate::Set(operated) = &update.liquid_operated {
            for well in &operated.well_names {
                self.operate(&operated.labware_id, well, operated.volume_added);
            }
        }
    }

    fn operate(&mut self, labware_id: &str, well_name: &str, delta: ValueOrClear<f64>) {
        if let Some(wells) = self.loaded_volumes.get_mut(labware_id) {
            match delta {
                ValueOrClear::Clear => {
                    wells.remove(well_name);
                }
                ValueOrClear::Value(added) => {
                    if let Some(info) = wells.get_mut(well_name) {
                        info.volume = info.volume.map(|v| v + added);
                        info.operations_since_load += 1;
                    }
                }
            }
        }

        if let Some(wells) = self.probed_heights.get_mut(labware_id) {
            wells.remove(well_name);
        }

        if let Some(wells) = self.probed_volumes.get_mut(labware_id) {
            match delta {
                ValueOrClear::Clear => {
                    wells.remove(well_name);
                }
                ValueOrClear::Value(added) => {
                    if let Some(info) = wells.get_mut(well_name) {
                        info.volume = info.volume.map(|v| v + added);
                        info.operations_since_probe += 1;
                    }
                }
            }
        }
    }

    /// All liquid info for one well.
    pub fn get_well_liquid_info(&self, labware_id: &str, well_name: &str) -> WellLiquidInfo {
        WellLiquidInfo {
            loaded_volume: lookup(&self.loaded_volumes, labware_id, well_name).cloned(),
            probed_height: lookup(&self.probed_heights, labware_id, well_name).cloned(),
            probed_volume: lookup(&self.probed_volumes, labware_id, well_name).cloned(),
        }
    }

    /// Last probed height of a well, if still valid.
    pub fn get_last_measured_height(&self, labware_id: &str, well_name: &str) -> Option<f64> {
        lookup(&self.probed_heights, labware_id, well_name).and_then(|info| info.height)
    }

    /// Summaries of every well with any liquid info, sorted by labware then well.
    pub fn get_all(&self) -> Vec<WellInfoSummary> {
        let keys: BTreeSet<(&str, &str)> = keys_of(&self.loaded_volumes)
            .chain(keys_of(&self.probed_heights))
            .chain(keys_of(&self.probed_volumes))
            .collect();
        keys.into_iter()
            .map(|(labware_id, well_name)| {
                let info = self.get_well_liquid_info(labware_id, well_name);
                WellInfoSummary {
                    labware_id: labware_id.to_string(),
                    well_name: well_name.to_string(),
                    loaded_volume: info.loaded_volume.and_then(|i| i.volume),
                    probed_volume: info.probed_volume.and_then(|i| i.volume),
                    probed_height: info.probed_height.and_then(|i| i.height),
                }
            })
            .collect()
    }
}

fn lookup<'a, T>(map: &'a PerWell<T>, labware_id: &str, well_name: &str) -> Option<&'a T> {
    map.get(labware_id).and_then(|wells| wells.get(well_name))
}

fn keys_of<T>(map: &PerWell<T>) -> impl Iterator<Item = (&str, &str)> {
    map.iter().flat_map(|(labware, wells)| {
        wells
            .keys()
            .map(move |well| (labware.as_str(), well.as_str()))
    })
}
