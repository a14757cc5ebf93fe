//! Per-command execution context.
//!
//! Borrows the collaborators and a read-only view of engine state for the
//! duration of one command, and collects the notes it emits.

use tracing::debug;
use vial_common::hal::driver::PipettingHardware;
use vial_common::hal::labware::{LabwareInfo, LabwareProvider};

use super::CommandNote;
use crate::error::EngineError;
use crate::state::pipettes::LoadedPipette;
use crate::state::EngineState;

/// Engine-wide switches read by command implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Modules are simulated; skip module hardware calls.
    pub use_virtual_modules: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            use_virtual_modules: true,
        }
    }
}

/// Everything a command implementation may touch.
pub struct CommandContext<'a> {
    /// Hardware collaborator.
    pub hardware: &'a dyn PipettingHardware,
    /// Labware and deck geometry.
    pub labware: &'a dyn LabwareProvider,
    /// State as of the start of the command.
    pub state: &'a EngineState,
    /// Engine switches.
    pub settings: &'a EngineSettings,
    notes: Vec<CommandNote>,
}

impl<'a> CommandContext<'a> {
    /// Context for one command.
    pub fn new(
        hardware: &'a dyn PipettingHardware,
        labware: &'a dyn LabwareProvider,
        state: &'a EngineState,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            hardware,
            labware,
            state,
            settings,
            notes: Vec::new(),
        }
    }

    /// Attach a note to the running command.
    pub fn add_note(&mut self, note: CommandNote) {
        debug!(kind = %note.note_kind, "{}", note.short_message);
        self.notes.push(note);
    }

    /// Notes collected so far.
    pub fn into_notes(self) -> Vec<CommandNote> {
        self.notes
    }

    /// Loaded pipette or `PipetteNotLoaded`.
    pub fn pipette(&self, pipette_id: &str) -> Result<&'a LoadedPipette, EngineError> {
        self.state
            .pipettes
            .get(pipette_id)
            .ok_or_else(|| EngineError::PipetteNotLoaded(pipette_id.to_string()))
    }

    /// Error unless the pipette has a tip.
    pub fn require_tip(&self, pipette_id: &str) -> Result<(), EngineError> {
        self.pipette(pipette_id)?;
        match self.state.pipettes.attached_tip(pipette_id) {
            Some(_) => Ok(()),
            None => Err(EngineError::TipNotAttached(pipette_id.to_string())),
        }
    }

    /// Static labware description.
    pub fn labware_info(&self, labware_id: &str) -> Result<&'a LabwareInfo, EngineError> {
        Ok(self.labware.labware(labware_id)?)
    }
}
