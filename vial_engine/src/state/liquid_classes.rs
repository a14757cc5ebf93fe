//! Liquid class sub-store.
//!
//! Records by id. Records are immutable once stored; a re-load of a record
//! equal to a stored one reuses its id.

use std::collections::BTreeMap;
use vial_common::liquid_class::LiquidClassRecord;

use super::update::{FieldUpdate, StateUpdate};
use crate::error::EngineError;

/// Liquid class sub-store state.
#[derive(Debug, Clone, Default)]
pub struct LiquidClassState {
    by_id: BTreeMap<String, LiquidClassRecord>,
}

impl LiquidClassState {
    /// Apply the liquid class field of an update.
    pub fn apply(&mut self, update: &StateUpdate) {
        if let FieldUpdate::Set(loaded) = &update.liquid_class_loaded {
            self.by_id
                .insert(loaded.liquid_class_id.clone(), loaded.record.clone());
        }
    }

    /// Record stored under `liquid_class_id`.
    pub fn get(&self, liquid_class_id: &str) -> Result<&LiquidClassRecord, EngineError> {
        self.by_id
            .get(liquid_class_id)
            .ok_or_else(|| EngineError::LiquidClassDoesNotExist(liquid_class_id.to_string()))
    }

    /// Id already assigned to an equal record.
    pub fn get_id_for_record(&self, record: &LiquidClassRecord) -> Option<&str> {
        self.by_id
            .iter()
            .find(|(_, stored)| *stored == record)
            .map(|(id, _)| id.as_str())
    }

    /// Every stored record by id.
    pub fn get_all(&self) -> &BTreeMap<String, LiquidClassRecord> {
        &self.by_id
    }
}
