//! Call-sequence checks for training loops that drive callbacks.
//!
//! [`HookSequencer`] sits between a training loop and its [`CallbackList`].
//! The loop reports each lifecycle event to the sequencer, which verifies
//! that the event is legal at that point of the run before dispatching it:
//!
//! - `on_train_begin` at most once per run, `on_train_end` only after it
//! - epochs strictly increasing, each `on_epoch_end` matching its begin
//! - batch numbers following the configured [`HookConvention`]
//! - `on_backward_end` exactly once per training batch, between its
//!   begin and end
//! - evaluation passes and batches properly bracketed
//!
//! The sequencer does no training work itself.

use crate::{
    CallbackContext, CallbackError, CallbackList, CallbackResult, Hook, Logs, Model,
    TrainingParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where epoch or batch numbering starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBase {
    /// Numbering starts at 0.
    #[default]
    Zero,
    /// Numbering starts at 1.
    One,
}

impl IndexBase {
    /// First index under this base.
    pub fn first(&self) -> usize {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }
}

/// Whether training batch numbers restart every epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchScope {
    /// Batch numbers restart at the base every epoch.
    #[default]
    PerEpoch,
    /// Batch numbers continue across epochs.
    Global,
}

/// Numbering convention a training loop follows when calling hooks.
///
/// Evaluation batches always restart at `batch_base` for every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConvention {
    /// Base of epoch numbers.
    pub epoch_base: IndexBase,
    /// Base of batch numbers.
    pub batch_base: IndexBase,
    /// Scope of training batch numbers.
    pub batch_scope: BatchScope,
}

impl HookConvention {
    /// One-based epochs and batches, batches restarting each epoch.
    pub fn one_based() -> Self {
        Self {
            epoch_base: IndexBase::One,
            batch_base: IndexBase::One,
            batch_scope: BatchScope::PerEpoch,
        }
    }
}

/// Configuration for a [`HookSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Numbering convention of the driving loop.
    pub convention: HookConvention,
    /// Reject out-of-order calls with an error. When false, violations are
    /// logged as warnings and the hook is dispatched anyway.
    pub strict: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            convention: HookConvention::default(),
            strict: true,
        }
    }
}

impl SequencerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CallbackResult<Self> {
        serde_json::from_str(json).map_err(|e| CallbackError::ConfigError(e.to_string()))
    }
}

/// Last index of `count` consecutive indices starting at `first`.
///
/// Saturates at `usize::MAX`, so huge plans read as unbounded.
fn last_index(first: usize, count: usize) -> usize {
    first.saturating_add(count.saturating_sub(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Training,
    InEpoch {
        epoch: usize,
    },
    InTrainBatch {
        epoch: usize,
        batch: usize,
        backward_done: bool,
    },
    Finished,
}

impl Phase {
    fn epoch(&self) -> Option<usize> {
        match self {
            Phase::InEpoch { epoch } | Phase::InTrainBatch { epoch, .. } => Some(*epoch),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "no run in progress"),
            Phase::Training => write!(f, "a run between epochs"),
            Phase::InEpoch { epoch } => write!(f, "open epoch {}", epoch),
            Phase::InTrainBatch { epoch, batch, .. } => {
                write!(f, "open train batch {} of epoch {}", batch, epoch)
            }
            Phase::Finished => write!(f, "a finished run"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TestPass {
    next_batch: usize,
    open_batch: Option<usize>,
}

/// Dispatches hooks to a [`CallbackList`] while checking the call sequence.
///
/// The model is passed to every call rather than stored, since the training
/// loop keeps working on it between hooks.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use scirs2_core::ndarray::{Array, Ix2};
/// use tensorlogic_callbacks::{CallbackList, HookSequencer, Logs, Model, TrainingParams};
///
/// struct Frozen(HashMap<String, Array<f64, Ix2>>);
///
/// impl Model for Frozen {
///     fn parameters(&self) -> &HashMap<String, Array<f64, Ix2>> { &self.0 }
///     fn parameters_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>> { &mut self.0 }
/// }
///
/// let params = TrainingParams::new(2, 3).unwrap();
/// let mut seq = HookSequencer::new(params, CallbackList::new());
/// let mut model = Frozen(HashMap::new());
///
/// seq.run(&mut model, &Logs::new(), |seq, model| {
///     for epoch in 0..2 {
///         seq.epoch_begin(model, epoch, &Logs::new())?;
///         for batch in 0..3 {
///             seq.train_batch_begin(model, batch, &Logs::new())?;
///             seq.backward_end(model, batch)?;
///             seq.train_batch_end(model, batch, &Logs::new().with_scalar("loss", 0.1))?;
///         }
///         seq.epoch_end(model, epoch, &Logs::new())?;
///     }
///     Ok(())
/// })
/// .unwrap();
/// ```
pub struct HookSequencer {
    params: TrainingParams,
    callbacks: CallbackList,
    config: SequencerConfig,
    phase: Phase,
    last_epoch: Option<usize>,
    next_batch: usize,
    test: Option<TestPass>,
    stop_requested: bool,
    last_epoch_logs: Logs,
}

impl HookSequencer {
    /// Create a sequencer with the default (strict, zero-based) configuration.
    pub fn new(params: TrainingParams, callbacks: CallbackList) -> Self {
        Self::with_config(params, callbacks, SequencerConfig::default())
    }

    /// Create a sequencer with an explicit configuration.
    pub fn with_config(
        params: TrainingParams,
        callbacks: CallbackList,
        config: SequencerConfig,
    ) -> Self {
        Self {
            params,
            callbacks,
            config,
            phase: Phase::Idle,
            last_epoch: None,
            next_batch: config.convention.batch_base.first(),
            test: None,
            stop_requested: false,
            last_epoch_logs: Logs::new(),
        }
    }

    /// Parameters of the run.
    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Active configuration.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Registered callbacks.
    pub fn callbacks(&self) -> &CallbackList {
        &self.callbacks
    }

    /// Registered callbacks, for adding more between runs.
    pub fn callbacks_mut(&mut self) -> &mut CallbackList {
        &mut self.callbacks
    }

    /// Consume the sequencer and return its callbacks.
    pub fn into_callbacks(self) -> CallbackList {
        self.callbacks
    }

    /// Whether `on_train_begin` was called and `on_train_end` was not.
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Finished)
    }

    /// Epoch currently open, if any.
    pub fn current_epoch(&self) -> Option<usize> {
        self.phase.epoch()
    }

    /// Whether a callback asked to stop at the last poll.
    ///
    /// Callbacks are polled after every `on_train_batch_end` and
    /// `on_epoch_end`. The flag resets when a new run begins.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    fn check(&self, hook: Hook, verdict: Result<(), String>) -> CallbackResult<()> {
        match verdict {
            Ok(()) => Ok(()),
            Err(reason) if self.config.strict => {
                Err(CallbackError::ContractViolation { hook, reason })
            }
            Err(reason) => {
                log::warn!("Contract violation in {}: {}", hook, reason);
                Ok(())
            }
        }
    }

    fn no_open_test(&self) -> Result<(), String> {
        match self.test {
            Some(_) => Err("an evaluation pass is still open".to_string()),
            None => Ok(()),
        }
    }

    fn last_train_batch(&self) -> usize {
        let first = self.config.convention.batch_base.first();
        match self.config.convention.batch_scope {
            BatchScope::PerEpoch => last_index(first, self.params.steps_per_epoch()),
            BatchScope::Global => last_index(first, self.params.total_steps()),
        }
    }

    fn poll_stop(&mut self) {
        if self.callbacks.should_stop() {
            if !self.stop_requested {
                log::debug!("Stop requested by a callback");
            }
            self.stop_requested = true;
        }
    }

    /// Start a run and call `on_train_begin`.
    pub fn train_begin(&mut self, model: &mut dyn Model, logs: &Logs) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::Idle | Phase::Finished => Ok(()),
            other => Err(format!("on_train_begin called during {}", other)),
        };
        self.check(Hook::TrainBegin, verdict)?;

        self.phase = Phase::Training;
        self.last_epoch = None;
        self.next_batch = self.config.convention.batch_base.first();
        self.test = None;
        self.stop_requested = false;
        self.last_epoch_logs.clear();

        log::debug!(
            "Training begins: {} epochs x {} steps, {} callbacks",
            self.params.epochs(),
            self.params.steps_per_epoch(),
            self.callbacks.len()
        );
        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_train_begin(&mut ctx, logs)
    }

    /// Finish the run and call `on_train_end`.
    ///
    /// Accepted from any point after `train_begin`, so a loop that stops
    /// early or fails mid-epoch can still close the run.
    pub fn train_end(&mut self, model: &mut dyn Model, logs: &Logs) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::Idle => Err("on_train_begin was never called".to_string()),
            Phase::Finished => Err("the run already ended".to_string()),
            _ => Ok(()),
        };
        self.check(Hook::TrainEnd, verdict)?;

        if self.phase != Phase::Training {
            log::debug!("Training terminated during {}", self.phase);
        }
        self.phase = Phase::Finished;
        self.test = None;

        log::debug!("Training ends after epoch {:?}", self.last_epoch);
        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_train_end(&mut ctx, logs)
    }

    /// Open an epoch and call `on_epoch_begin`.
    pub fn epoch_begin(
        &mut self,
        model: &mut dyn Model,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let first = self.config.convention.epoch_base.first();
        let last = last_index(first, self.params.epochs());
        let verdict = match self.phase {
            Phase::Training => match self.last_epoch {
                Some(prev) if epoch <= prev => {
                    Err(format!("epoch {} does not follow epoch {}", epoch, prev))
                }
                None if epoch < first => {
                    Err(format!("epoch {} precedes the first epoch {}", epoch, first))
                }
                _ if epoch > last => {
                    Err(format!("epoch {} exceeds the last planned epoch {}", epoch, last))
                }
                _ => Ok(()),
            },
            other => Err(format!("expected a run between epochs, found {}", other)),
        }
        .and_then(|()| self.no_open_test());
        self.check(Hook::EpochBegin, verdict)?;

        self.phase = Phase::InEpoch { epoch };
        if self.config.convention.batch_scope == BatchScope::PerEpoch {
            self.next_batch = self.config.convention.batch_base.first();
        }

        log::debug!("Epoch {} begins", epoch);
        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_epoch_begin(&mut ctx, epoch, logs)
    }

    /// Close an epoch and call `on_epoch_end`.
    pub fn epoch_end(
        &mut self,
        model: &mut dyn Model,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::InEpoch { epoch: open } if open == epoch => Ok(()),
            Phase::InEpoch { epoch: open } => {
                Err(format!("epoch {} is open, got epoch {}", open, epoch))
            }
            other => Err(format!("expected an open epoch, found {}", other)),
        }
        .and_then(|()| self.no_open_test());
        self.check(Hook::EpochEnd, verdict)?;

        self.phase = Phase::Training;
        self.last_epoch = Some(epoch);
        self.last_epoch_logs = logs.clone();

        log::debug!("Epoch {} ends", epoch);
        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_epoch_end(&mut ctx, epoch, logs)?;
        self.poll_stop();
        Ok(())
    }

    /// Open a training batch and call `on_train_batch_begin`.
    pub fn train_batch_begin(
        &mut self,
        model: &mut dyn Model,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::InEpoch { .. } if batch != self.next_batch => {
                Err(format!("expected batch {}, got batch {}", self.next_batch, batch))
            }
            Phase::InEpoch { .. } if batch > self.last_train_batch() => Err(format!(
                "batch {} exceeds the last planned batch {}",
                batch,
                self.last_train_batch()
            )),
            Phase::InEpoch { .. } => Ok(()),
            other => Err(format!("expected an open epoch, found {}", other)),
        }
        .and_then(|()| self.no_open_test());
        self.check(Hook::TrainBatchBegin, verdict)?;

        let epoch = self
            .phase
            .epoch()
            .or(self.last_epoch)
            .unwrap_or_else(|| self.config.convention.epoch_base.first());
        self.phase = Phase::InTrainBatch {
            epoch,
            batch,
            backward_done: false,
        };

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_train_batch_begin(&mut ctx, batch, logs)
    }

    /// Report the end of gradient computation and call `on_backward_end`.
    pub fn backward_end(&mut self, model: &mut dyn Model, batch: usize) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::InTrainBatch {
                batch: open,
                backward_done: false,
                ..
            } if open == batch => Ok(()),
            Phase::InTrainBatch {
                batch: open,
                backward_done: true,
                ..
            } if open == batch => {
                Err(format!("on_backward_end already called for batch {}", batch))
            }
            Phase::InTrainBatch { batch: open, .. } => {
                Err(format!("train batch {} is open, got batch {}", open, batch))
            }
            other => Err(format!("expected an open train batch, found {}", other)),
        };
        self.check(Hook::BackwardEnd, verdict)?;

        if let Phase::InTrainBatch { backward_done, .. } = &mut self.phase {
            *backward_done = true;
        }

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_backward_end(&mut ctx, batch)
    }

    /// Close a training batch and call `on_train_batch_end`.
    pub fn train_batch_end(
        &mut self,
        model: &mut dyn Model,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let verdict = match self.phase {
            Phase::InTrainBatch {
                batch: open,
                backward_done: true,
                ..
            } if open == batch => Ok(()),
            Phase::InTrainBatch {
                batch: open,
                backward_done: false,
                ..
            } if open == batch => {
                Err(format!("on_backward_end was not called for batch {}", batch))
            }
            Phase::InTrainBatch { batch: open, .. } => {
                Err(format!("train batch {} is open, got batch {}", open, batch))
            }
            other => Err(format!("expected an open train batch, found {}", other)),
        };
        self.check(Hook::TrainBatchEnd, verdict)?;

        let epoch = self
            .phase
            .epoch()
            .or(self.last_epoch)
            .unwrap_or_else(|| self.config.convention.epoch_base.first());
        self.phase = Phase::InEpoch { epoch };
        self.next_batch = batch.saturating_add(1);

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_train_batch_end(&mut ctx, batch, logs)?;
        self.poll_stop();
        Ok(())
    }

    /// Open an evaluation pass and call `on_test_begin`.
    ///
    /// Allowed inside an epoch (validation) or outside a run (standalone
    /// evaluation), but not while a training batch is open.
    pub fn test_begin(&mut self, model: &mut dyn Model, logs: &Logs) -> CallbackResult<()> {
        let verdict = match (self.test, self.phase) {
            (Some(_), _) => Err("an evaluation pass is already open".to_string()),
            (None, phase @ Phase::InTrainBatch { .. }) => {
                Err(format!("cannot evaluate during {}", phase))
            }
            (None, _) => Ok(()),
        };
        self.check(Hook::TestBegin, verdict)?;

        self.test = Some(TestPass {
            next_batch: self.config.convention.batch_base.first(),
            open_batch: None,
        });

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_test_begin(&mut ctx, logs)
    }

    /// Close an evaluation pass and call `on_test_end`.
    pub fn test_end(&mut self, model: &mut dyn Model, logs: &Logs) -> CallbackResult<()> {
        let verdict = match self.test {
            Some(TestPass {
                open_batch: Some(open),
                ..
            }) => Err(format!("test batch {} is still open", open)),
            Some(_) => Ok(()),
            None => Err("no evaluation pass is open".to_string()),
        };
        self.check(Hook::TestEnd, verdict)?;

        self.test = None;

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_test_end(&mut ctx, logs)
    }

    /// Open an evaluation batch and call `on_test_batch_begin`.
    pub fn test_batch_begin(
        &mut self,
        model: &mut dyn Model,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let first = self.config.convention.batch_base.first();
        let verdict = match self.test {
            Some(TestPass {
                open_batch: Some(open),
                ..
            }) => Err(format!("test batch {} is still open", open)),
            Some(TestPass { next_batch, .. }) if batch != next_batch => {
                Err(format!("expected test batch {}, got batch {}", next_batch, batch))
            }
            Some(_) => match self.params.validation_steps() {
                Some(steps) if batch > last_index(first, steps) => Err(format!(
                    "test batch {} exceeds the last planned batch {}",
                    batch,
                    last_index(first, steps)
                )),
                _ => Ok(()),
            },
            None => Err("no evaluation pass is open".to_string()),
        };
        self.check(Hook::TestBatchBegin, verdict)?;

        let pass = self.test.get_or_insert(TestPass {
            next_batch: batch,
            open_batch: None,
        });
        pass.open_batch = Some(batch);

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_test_batch_begin(&mut ctx, batch, logs)
    }

    /// Close an evaluation batch and call `on_test_batch_end`.
    pub fn test_batch_end(
        &mut self,
        model: &mut dyn Model,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        let verdict = match self.test {
            Some(TestPass {
                open_batch: Some(open),
                ..
            }) if open == batch => Ok(()),
            Some(TestPass {
                open_batch: Some(open),
                ..
            }) => Err(format!("test batch {} is open, got batch {}", open, batch)),
            Some(_) => Err("no test batch is open".to_string()),
            None => Err("no evaluation pass is open".to_string()),
        };
        self.check(Hook::TestBatchEnd, verdict)?;

        if let Some(pass) = self.test.as_mut() {
            pass.open_batch = None;
            pass.next_batch = batch.saturating_add(1);
        }

        let mut ctx = CallbackContext::new(&self.params, model);
        self.callbacks.on_test_batch_end(&mut ctx, batch, logs)
    }

    /// Bracket `body` with `train_begin` and `train_end`.
    ///
    /// `on_train_end` is called even when `body` or one of its hooks fails,
    /// and receives the logs of the last completed epoch. The first error is
    /// returned. If `body` already ended the run, no second `on_train_end`
    /// is dispatched.
    pub fn run<T, F>(&mut self, model: &mut dyn Model, logs: &Logs, body: F) -> CallbackResult<T>
    where
        F: FnOnce(&mut Self, &mut dyn Model) -> CallbackResult<T>,
    {
        let outcome = match self.train_begin(&mut *model, logs) {
            Err(err @ CallbackError::ContractViolation { .. }) => return Err(err),
            Err(err) => Err(err),
            Ok(()) => body(&mut *self, &mut *model),
        };

        let ended = if self.is_running() {
            let end_logs = std::mem::take(&mut self.last_epoch_logs);
            let ended = self.train_end(model, &end_logs);
            self.last_epoch_logs = end_logs;
            ended
        } else {
            Ok(())
        };

        if let Err(err) = &outcome {
            log::debug!("Training run failed: {}", err);
        }
        match (outcome, ended) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }
}
