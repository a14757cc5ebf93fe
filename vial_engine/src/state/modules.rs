//! Module sub-store.
//!
//! Loaded modules and the per-model substate the engine tracks for them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::update::{FieldUpdate, StateUpdate};
use crate::error::EngineError;

/// Module hardware model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleModel {
    /// Plate reader with a removable lid.
    AbsorbanceReaderV1,
    /// Temperature block.
    TemperatureModuleV2,
    /// Heater-shaker.
    HeaterShakerModuleV1,
    /// Thermocycler.
    ThermocyclerModuleV2,
}

impl ModuleModel {
    /// True for plate readers.
    pub const fn is_absorbance_reader(self) -> bool {
        matches!(self, Self::AbsorbanceReaderV1)
    }
}

/// Loaded module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedModule {
    /// Engine id.
    pub id: String,
    /// Model.
    pub model: ModuleModel,
    /// Deck slot.
    pub location: String,
}

/// Plate-reader specific state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceReaderSubState {
    /// Module id.
    pub module_id: String,
    /// A measurement was configured.
    pub configured: bool,
    /// A measurement was taken.
    pub measured: bool,
    /// Lid sits on the reader.
    pub is_lid_on: bool,
}

impl AbsorbanceReaderSubState {
    /// Error unless the lid is where the caller expects it.
    pub fn raise_if_lid_status_not_expected(&self, lid_on_expected: bool) -> Result<(), EngineError> {
        if self.is_lid_on == lid_on_expected {
            return Ok(());
        }
        let status = if self.is_lid_on { "closed" } else { "open" };
        Err(EngineError::CannotPerformModuleAction(format!(
            "Cannot perform lid action because the lid is already {status}"
        )))
    }
}

/// Module sub-store state.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    modules: BTreeMap<String, LoadedModule>,
    absorbance_readers: BTreeMap<String, AbsorbanceReaderSubState>,
}

impl ModuleState {
    /// Apply the module fields of an update.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let FieldUpdate::Set(loaded) = &update.module_loaded {
            self.modules.insert(
                loaded.module_id.clone(),
                LoadedModule {
                    id: loaded.module_id.clone(),
                    model: loaded.model,
                    location: loaded.location.clone(),
                },
            );
            if loaded.model.is_absorbance_reader() {
                self.absorbance_readers.insert(
                    loaded.module_id.clone(),
                    AbsorbanceReaderSubState {
                        module_id: loaded.module_id.clone(),
                        configured: false,
                        measured: false,
                        is_lid_on: true,
                    },
                );
            }
        }

        if let FieldUpdate::Set(lid) = &update.absorbance_reader_lid {
            if let Some(reader) = self.absorbance_readers.get_mut(&lid.module_id) {
                reader.is_lid_on = lid.is_lid_on;
            }
        }
    }

    /// Loaded module by id.
    pub fn get(&self, module_id: &str) -> Result<&LoadedModule, EngineError> {
        self.modules
            .get(module_id)
            .ok_or_else(|| EngineError::ModuleNotLoaded(module_id.to_string()))
    }

    /// Module loaded in deck slot `slot`, if any.
    pub fn get_by_slot(&self, slot: &str) -> Option<&LoadedModule> {
        self.modules.values().find(|module| module.location == slot)
    }

    /// Every loaded module.
    pub fn get_all(&self) -> impl Iterator<Item = &LoadedModule> {
        self.modules.values()
    }

    /// Plate-reader substate, erroring for other models.
    pub fn get_absorbance_reader_substate(
        &self,
        module_id: &str,
    ) -> Result<&AbsorbanceReaderSubState, EngineError> {
        self.get(module_id)?;
        self.absorbance_readers
            .get(module_id)
            .ok_or_else(|| EngineError::WrongModuleType {
                module_id: module_id.to_string(),
                expected: "absorbance reader".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_starts_with_lid_on() {
        let mut state = ModuleState::default();
        state.apply(&StateUpdate::new().set_module_loaded("reader", ModuleModel::AbsorbanceReaderV1, "D3"));
        let reader = state.get_absorbance_reader_substate("reader").unwrap();
        assert!(reader.is_lid_on);
        assert!(reader.raise_if_lid_status_not_expected(true).is_ok());

        state.apply(&StateUpdate::new().set_absorbance_reader_lid("reader", false));
        let reader = state.get_absorbance_reader_substate("reader").unwrap();
        let err = reader.raise_if_lid_status_not_expected(true).unwrap_err();
        assert!(err.to_string().contains("already open"));
    }

    #[test]
    fn wrong_model_and_missing_module() {
        let mut state = ModuleState::default();
        state.apply(&StateUpdate::new().set_module_loaded("temp", ModuleModel::TemperatureModuleV2, "C1"));
        assert!(matches!(
            state.get_absorbance_reader_substate("temp"),
            Err(EngineError::WrongModuleType { .. })
        ));
        assert!(matches!(
            state.get_absorbance_reader_substate("nope"),
            Err(EngineError::ModuleNotLoaded(_))
        ));
        assert_eq!(state.get_all().count(), 1);
        assert_eq!(state.get("temp").unwrap().location, "C1");
        assert_eq!(state.get_by_slot("C1").map(|m| m.id.as_str()), Some("temp"));
        assert!(state.get_by_slot("D3").is_none());
    }
}
