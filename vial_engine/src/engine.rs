//! Protocol engine: command queue, dispatch and state ownership.
//!
//! The engine is the only writer of [`EngineState`]. Commands run strictly
//! one at a time in submission order (fixit commands jump the queue). A
//! command's update is applied only after its hardware interaction has
//! completed; a stopped command applies nothing.
//!
//! ## Recovery Gate
//!
//! A defined error leaves a pending recovery. Until a command that
//! satisfies it succeeds, every motion command that does not satisfy it
//! fails with [`EngineError::RecoveryRequired`].

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use vial_common::consts::DEFAULT_LIQUID_CLASS_VERSION;
use vial_common::hal::driver::PipettingHardware;
use vial_common::hal::labware::LabwareProvider;
use vial_common::liquid_class::{self, LiquidClassError, LiquidClassRecord};

use crate::command::context::{CommandContext, EngineSettings};
use crate::command::outcome::Execution;
use crate::command::{
    self, Command, CommandCreate, CommandIntent, CommandParams, CommandStatus,
};
use crate::error::{DefinedError, EngineError, ErrorOccurrence};
use crate::resources;
use crate::state::update::StateUpdate;
use crate::state::EngineState;

// ─── Stop Handle ────────────────────────────────────────────────────

/// Cloneable handle that stops the run from anywhere.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Stop the run. The in-flight command and every later one fail with
    /// `RunStopped`.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the run has been stopped.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

// ─── Pending Recovery ───────────────────────────────────────────────

/// Defined error awaiting recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecovery {
    /// Command that failed.
    pub command_id: String,
    /// The error.
    pub error: DefinedError,
    /// Update to apply if the error turns out to be spurious.
    pub state_update_if_false_positive: StateUpdate,
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Executes commands against a hardware collaborator.
pub struct ProtocolEngine {
    hardware: Arc<dyn PipettingHardware>,
    labware: Arc<dyn LabwareProvider>,
    settings: EngineSettings,
    liquid_class_dir: Option<PathBuf>,
    state: EngineState,
    commands: Vec<Command>,
    index: HashMap<String, usize>,
    queue: VecDeque<usize>,
    fixit_queue: VecDeque<usize>,
    pending_recovery: Option<PendingRecovery>,
    started: bool,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl ProtocolEngine {
    /// Engine with empty state.
    pub fn new(
        hardware: Arc<dyn PipettingHardware>,
        labware: Arc<dyn LabwareProvider>,
        settings: EngineSettings,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        info!(
            "Protocol engine created (driver {} v{}, virtual modules: {})",
            hardware.name(),
            hardware.version(),
            settings.use_virtual_modules
        );
        Self {
            hardware,
            labware,
            settings,
            liquid_class_dir: None,
            state: EngineState::new(),
            commands: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
            fixit_queue: VecDeque::new(),
            pending_recovery: None,
            started: false,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Read liquid class definitions from `dir`.
    pub fn with_liquid_class_dir(mut self, dir: PathBuf) -> Self {
        self.liquid_class_dir = Some(dir);
        self
    }

    // ── Queries ──

    /// Current engine state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Command by id.
    pub fn get_command(&self, command_id: &str) -> Result<&Command, EngineError> {
        self.index
            .get(command_id)
            .map(|&i| &self.commands[i])
            .ok_or_else(|| EngineError::CommandNotFound(command_id.to_string()))
    }

    /// Every command in submission order.
    pub fn get_all_commands(&self) -> &[Command] {
        &self.commands
    }

    /// Defined error awaiting recovery, if any.
    pub fn pending_recovery(&self) -> Option<&PendingRecovery> {
        self.pending_recovery.as_ref()
    }

    /// Handle that stops this engine's run.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    // ── Submission ──

    /// Queue a command.
    ///
    /// Setup commands are refused once a protocol command has started, and
    /// fixit commands unless a recovery is pending.
    pub fn add_command(&mut self, request: CommandCreate) -> Result<Command, EngineError> {
        let command_type = request.params.command_type();
        if self.is_stopped() {
            return Err(EngineError::RunStopped);
        }
        match request.intent {
            CommandIntent::Setup if self.started => {
                return Err(EngineError::SetupCommandAfterStart(command_type.to_string()));
            }
            CommandIntent::Fixit if self.pending_recovery.is_none() => {
                return Err(EngineError::FixitWithoutRecovery(command_type.to_string()));
            }
            _ => {}
        }

        let command = Command {
            id: resources::generate_id(),
            key: request.key.unwrap_or_else(resources::generate_id),
            intent: request.intent,
            params: request.params,
            status: CommandStatus::Queued,
            result: None,
            error: None,
            defined_error: None,
            created_at: resources::now(),
            started_at: None,
            completed_at: None,
            notes: Vec::new(),
        };
        debug!(id = %command.id, "Queued {} ({:?})", command_type, command.intent);

        let slot = self.commands.len();
        self.index.insert(command.id.clone(), slot);
        match command.intent {
            CommandIntent::Fixit => self.fixit_queue.push_back(slot),
            _ => self.queue.push_back(slot),
        }
        self.commands.push(command.clone());
        Ok(command)
    }

    /// Queue a command and run the queue until it is empty.
    pub async fn execute_command(&mut self, request: CommandCreate) -> Result<Command, EngineError> {
        let id = self.add_command(request)?.id;
        self.run_until_idle().await;
        self.get_command(&id).cloned()
    }

    /// Run queued commands one at a time, fixit commands first.
    pub async fn run_until_idle(&mut self) {
        while let Some(slot) = self
            .fixit_queue
            .pop_front()
            .or_else(|| self.queue.pop_front())
        {
            self.run_command(slot).await;
        }
    }

    // ── Execution ──

    fn gate(&self, params: &CommandParams) -> Result<(), EngineError> {
        let Some(pending) = &self.pending_recovery else {
            return Ok(());
        };
        if !params.is_motion() {
            return Ok(());
        }
        let satisfies = params
            .recovery_action()
            .is_some_and(|action| pending.error.satisfied_by().contains(&action));
        if satisfies {
            Ok(())
        } else {
            Err(EngineError::RecoveryRequired {
                error_type: pending.error.error_type().to_string(),
                minimum_action: pending.error.minimum_recovery().command_type().to_string(),
            })
        }
    }

    async fn run_command(&mut self, slot: usize) {
        let params = self.commands[slot].params.clone();
        let command_type = params.command_type();
        {
            let command = &mut self.commands[slot];
            command.status = CommandStatus::Running;
            command.started_at = Some(resources::now());
            if command.intent == CommandIntent::Protocol {
                self.started = true;
            }
        }

        let (outcome, notes) = if self.is_stopped() {
            (Err(EngineError::RunStopped), Vec::new())
        } else if let Err(err) = self.gate(&params) {
            (Err(err), Vec::new())
        } else {
            let mut ctx = CommandContext::new(
                self.hardware.as_ref(),
                self.labware.as_ref(),
                &self.state,
                &self.settings,
            );
            let mut stop_rx = self.stop_rx.clone();
            let outcome = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => Err(EngineError::RunStopped),
                outcome = command::execute(&params, &mut ctx) => outcome,
            };
            (outcome, ctx.into_notes())
        };

        let id = self.commands[slot].id.clone();
        match outcome {
            Ok(Execution::Success(success)) => {
                self.state.apply(&success.state_update);
                if let Some(action) = params.recovery_action() {
                    let cleared = self
                        .pending_recovery
                        .as_ref()
                        .is_some_and(|p| p.error.satisfied_by().contains(&action));
                    if cleared {
                        info!("Recovery satisfied by {}", command_type);
                        self.pending_recovery = None;
                    }
                }
                let command = &mut self.commands[slot];
                command.status = CommandStatus::Succeeded;
                command.result = Some(success.public);
                info!(id = %id, "{} succeeded", command_type);
            }
            Ok(Execution::DefinedError(defined)) => {
                self.state.apply(&defined.state_update);
                warn!(
                    id = %id,
                    "{} failed with defined error {}: minimum recovery {}",
                    command_type,
                    defined.public.error_type(),
                    defined.public.minimum_recovery().command_type()
                );
                let command = &mut self.commands[slot];
                command.status = CommandStatus::Failed;
                command.error = Some(defined.public.occurrence().clone());
                command.defined_error = Some(defined.public.clone());
                self.pending_recovery = Some(PendingRecovery {
                    command_id: id,
                    error: defined.public,
                    state_update_if_false_positive: defined.state_update_if_false_positive,
                });
            }
            Err(err) => {
                error!(id = %id, "{} failed: {}", command_type, err);
                let command = &mut self.commands[slot];
                command.status = CommandStatus::Failed;
                command.error = Some(ErrorOccurrence::unclassified(&err));
            }
        }

        let command = &mut self.commands[slot];
        command.completed_at = Some(resources::now());
        command.notes = notes;
    }

    // ── Recovery ──

    /// Leave recovery without running a satisfying command.
    ///
    /// With `reconcile_false_positive` the failed command's alternative
    /// update is applied, for errors the operator found to be spurious.
    pub fn resume_from_recovery(&mut self, reconcile_false_positive: bool) {
        if let Some(pending) = self.pending_recovery.take() {
            info!(
                "Resuming after {} (false positive: {})",
                pending.error.error_type(),
                reconcile_false_positive
            );
            if reconcile_false_positive {
                self.state.apply(&pending.state_update_if_false_positive);
            }
        }
    }

    // ── Liquid Classes ──

    /// Record of a stored liquid class definition for one pipette and
    /// tip rack, ready for a `loadLiquidClass` command.
    pub fn liquid_class_record(
        &self,
        name: &str,
        pipette_model: &str,
        tiprack: &str,
    ) -> Result<LiquidClassRecord, EngineError> {
        let dir = self
            .liquid_class_dir
            .as_deref()
            .ok_or_else(|| LiquidClassError::DefinitionDoesNotExist(name.to_string()))?;
        let definition = liquid_class::load_definition(dir, name, DEFAULT_LIQUID_CLASS_VERSION)?;
        definition
            .record_for(pipette_model, tiprack)
            .ok_or_else(|| {
                EngineError::LiquidClassDoesNotExist(format!(
                    "{name} for {pipette_model} with {tiprack}"
                ))
            })
    }
}
