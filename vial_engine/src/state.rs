//! Engine state root.
//!
//! [`EngineState`] is composed of independent sub-stores. Each one reads
//! only its own fields of a [`StateUpdate`](update::StateUpdate) and never
//! looks at another sub-store while applying it.

pub mod fluid_stack;
pub mod labware;
pub mod liquid_classes;
pub mod modules;
pub mod pipettes;
pub mod update;
pub mod wells;

use tracing::debug;

use labware::LabwareState;
use liquid_classes::LiquidClassState;
use modules::ModuleState;
use pipettes::PipetteState;
use update::StateUpdate;
use wells::WellState;

/// All engine state for one run.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// Pipettes, tips, fluid and location.
    pub pipettes: PipetteState,
    /// Per-well liquid info.
    pub wells: WellState,
    /// Stored liquid classes.
    pub liquid_classes: LiquidClassState,
    /// Loaded modules.
    pub modules: ModuleState,
    /// Labware moved during the run.
    pub labware: LabwareState,
}

impl EngineState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a completed command's update to every sub-store.
    pub fn apply(&mut self, update: &StateUpdate) {
        if update.is_empty() {
            return;
        }
        debug!("Applying state update");
        self.pipettes.apply(update);
        self.wells.apply(update);
        self.liquid_classes.apply(update);
        self.modules.apply(update);
        self.labware.apply(update);
    }
}
