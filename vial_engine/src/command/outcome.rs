//! Command execution outcomes.
//!
//! Every command implementation returns
//! `Result<Execution<T>, EngineError>`: `Ok(Success)`, `Ok(DefinedError)`,
//! or `Err` for an unclassified failure. Multi-step commands compose their
//! steps by matching on each [`Execution`] and merging state updates with
//! [`StateUpdate::reduce`].

use crate::error::DefinedError;
use crate::state::update::StateUpdate;

/// Successful step or command.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessData<T> {
    /// Public result payload.
    pub public: T,
    /// State changes to apply.
    pub state_update: StateUpdate,
}

impl<T> SuccessData<T> {
    /// Build a success.
    pub fn new(public: T, state_update: StateUpdate) -> Self {
        Self {
            public,
            state_update,
        }
    }
}

/// Step or command that failed with a defined error.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedErrorData {
    /// Public error payload.
    pub public: DefinedError,
    /// State changes to apply.
    pub state_update: StateUpdate,
    /// State changes to apply instead if the error turns out to be spurious.
    pub state_update_if_false_positive: StateUpdate,
}

impl DefinedErrorData {
    /// Defined error with no false-positive alternative.
    pub fn new(public: DefinedError, state_update: StateUpdate) -> Self {
        Self {
            public,
            state_update,
            state_update_if_false_positive: StateUpdate::new(),
        }
    }

    /// Set the false-positive update.
    pub fn with_false_positive(mut self, update: StateUpdate) -> Self {
        self.state_update_if_false_positive = update;
        self
    }

    /// Merge `earlier` under both updates, keeping this step's changes on top.
    pub fn after(mut self, earlier: &StateUpdate) -> Self {
        self.state_update = earlier.clone().reduce(self.state_update);
        self.state_update_if_false_positive =
            earlier.clone().reduce(self.state_update_if_false_positive);
        self
    }
}

/// Outcome of a step that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution<T> {
    /// Step succeeded.
    Success(SuccessData<T>),
    /// Step failed with a defined error.
    DefinedError(DefinedErrorData),
}

impl<T> Execution<T> {
    /// Success shorthand.
    pub fn success(public: T, state_update: StateUpdate) -> Self {
        Self::Success(SuccessData::new(public, state_update))
    }

    /// Convert the success payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Execution<U> {
        match self {
            Self::Success(s) => Execution::Success(SuccessData::new(f(s.public), s.state_update)),
            Self::DefinedError(e) => Execution::DefinedError(e),
        }
    }

    /// Update applied if this outcome is committed.
    pub fn state_update(&self) -> &StateUpdate {
        match self {
            Self::Success(s) => &s.state_update,
            Self::DefinedError(e) => &e.state_update,
        }
    }
}
