//! `loadModule` and the absorbance reader lid commands.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vial_common::hal::driver::LidAction;

use super::context::CommandContext;
use super::outcome::Execution;
use crate::error::EngineError;
use crate::resources;
use crate::state::modules::ModuleModel;
use crate::state::update::StateUpdate;

/// Params of `loadModule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleParams {
    /// Module model.
    pub model: ModuleModel,
    /// Deck slot name.
    pub location: String,
    /// Id to use; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

/// Public result of `loadModule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleResult {
    /// Assigned id.
    pub module_id: String,
    /// Loaded model.
    pub model: ModuleModel,
}

/// Params of the lid commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LidParams {
    /// Absorbance reader.
    pub module_id: String,
}

/// Register a module in its deck slot.
pub fn load_module(
    _ctx: &mut CommandContext<'_>,
    params: &LoadModuleParams,
) -> Result<Execution<LoadModuleResult>, EngineError> {
    let module_id = params
        .module_id
        .clone()
        .unwrap_or_else(resources::generate_id);
    let update = StateUpdate::new().set_module_loaded(&module_id, params.model, &params.location);
    Ok(Execution::success(
        LoadModuleResult {
            module_id,
            model: params.model,
        },
        update,
    ))
}

/// Put the lid on (`lid_on`) or take it off an absorbance reader.
///
/// A lid already in place needs no hardware call. Virtual modules never
/// reach the hardware.
pub async fn set_lid(
    ctx: &mut CommandContext<'_>,
    params: &LidParams,
    lid_on: bool,
) -> Result<Execution<()>, EngineError> {
    let reader = ctx
        .state
        .modules
        .get_absorbance_reader_substate(&params.module_id)?;

    if reader.is_lid_on == lid_on {
        debug!(module_id = %params.module_id, lid_on, "Lid already in place");
    } else if !ctx.settings.use_virtual_modules {
        let action = if lid_on { LidAction::Close } else { LidAction::Open };
        ctx.hardware
            .move_module_lid(&params.module_id, action)
            .await?;
    }

    Ok(Execution::success(
        (),
        StateUpdate::new().set_absorbance_reader_lid(&params.module_id, lid_on),
    ))
}
