//! `loadLiquid` and `loadLiquidClass`. Neither touches hardware.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vial_common::consts::EMPTY_LIQUID_ID;
use vial_common::liquid_class::LiquidClassRecord;

use super::context::CommandContext;
use super::outcome::Execution;
use crate::error::EngineError;
use crate::resources;
use crate::state::update::{StateUpdate, ValueOrClear};

/// Params of `loadLiquid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidParams {
    /// Declared liquid, or `EMPTY`.
    pub liquid_id: String,
    /// Labware holding it.
    pub labware_id: String,
    /// Starting µL per well.
    pub volume_by_well: BTreeMap<String, f64>,
}

/// Params of `loadLiquidClass`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidClassParams {
    /// Id to store under; reused or generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid_class_id: Option<String>,
    /// Transfer properties.
    pub liquid_class_record: LiquidClassRecord,
}

/// Public result of `loadLiquidClass`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidClassResult {
    /// Id the record is stored under.
    pub liquid_class_id: String,
}

/// Declare the starting volume of wells.
pub fn load_liquid(
    ctx: &mut CommandContext<'_>,
    params: &LoadLiquidParams,
) -> Result<Execution<()>, EngineError> {
    ctx.labware_info(&params.labware_id)?;
    for (well_name, volume) in &params.volume_by_well {
        ctx.labware.well(&params.labware_id, well_name)?;
        if *volume < 0.0 {
            return Err(EngineError::InvalidLiquid(format!(
                "volume for well {well_name} cannot be negative"
            )));
        }
        if params.liquid_id == EMPTY_LIQUID_ID && *volume != 0.0 {
            return Err(EngineError::InvalidLiquid(format!(
                "{EMPTY_LIQUID_ID} liquid needs a zero volume, got {volume} in {well_name}"
            )));
        }
    }

    let volumes = params
        .volume_by_well
        .iter()
        .map(|(well, volume)| (well.clone(), ValueOrClear::Value(*volume)))
        .collect();
    Ok(Execution::success(
        (),
        StateUpdate::new().set_liquid_loaded(&params.labware_id, volumes, resources::now()),
    ))
}

/// Store a liquid class record.
///
/// An identical record is never stored twice; a different record under an
/// existing id is rejected.
pub fn load_liquid_class(
    ctx: &mut CommandContext<'_>,
    params: &LoadLiquidClassParams,
) -> Result<Execution<LoadLiquidClassResult>, EngineError> {
    let record = &params.liquid_class_record;
    let store = &ctx.state.liquid_classes;

    let liquid_class_id = match &params.liquid_class_id {
        Some(id) => {
            if let Ok(existing) = store.get(id) {
                if existing != record {
                    return Err(EngineError::LiquidClassRedefinition(id.clone()));
                }
                return Ok(Execution::success(
                    LoadLiquidClassResult {
                        liquid_class_id: id.clone(),
                    },
                    StateUpdate::new(),
                ));
            }
            id.clone()
        }
        None => match store.get_id_for_record(record) {
            Some(id) => {
                return Ok(Execution::success(
                    LoadLiquidClassResult {
                        liquid_class_id: id.to_string(),
                    },
                    StateUpdate::new(),
                ));
            }
            None => resources::generate_id(),
        },
    };

    Ok(Execution::success(
        LoadLiquidClassResult {
            liquid_class_id: liquid_class_id.clone(),
        },
        StateUpdate::new().set_liquid_class_loaded(&liquid_class_id, record.clone()),
    ))
}
