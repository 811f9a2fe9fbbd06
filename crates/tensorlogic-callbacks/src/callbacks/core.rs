//! Core callback infrastructure for training.

use crate::{CallbackResult, Logs, Model, TrainingParams};

/// Shared state lent to every hook: the run's parameters and the model.
///
/// The training loop builds a context for each hook call, so params and model
/// are always present while a hook runs and are released when it returns.
pub struct CallbackContext<'a> {
    params: &'a TrainingParams,
    model: &'a mut dyn Model,
}

impl<'a> CallbackContext<'a> {
    /// Create a context for one hook invocation.
    pub fn new(params: &'a TrainingParams, model: &'a mut dyn Model) -> Self {
        Self { params, model }
    }

    /// Parameters of the current run.
    pub fn params(&self) -> &TrainingParams {
        self.params
    }

    /// The model under training.
    pub fn model(&self) -> &dyn Model {
        &*self.model
    }

    /// The model under training, for callbacks that adjust it.
    pub fn model_mut(&mut self) -> &mut dyn Model {
        &mut *self.model
    }
}

/// Trait for training callbacks.
///
/// Every hook defaults to a no-op, so an implementation overrides only the
/// events it cares about. Hooks are called synchronously by the training loop
/// in the order below; an error returned from a hook is propagated to the
/// loop unchanged.
///
/// | Hook | Called |
/// |---|---|
/// | `on_train_begin` / `on_train_end` | around the whole run; `on_train_end` also after early termination |
/// | `on_epoch_begin` / `on_epoch_end` | around each epoch, with the same epoch number |
/// | `on_train_batch_begin` / `on_train_batch_end` | around each training step |
/// | `on_backward_end` | once per training step, after gradients and before the optimizer step |
/// | `on_test_begin` / `on_test_end` | around an evaluation pass |
/// | `on_test_batch_begin` / `on_test_batch_end` | around each evaluation batch |
///
/// Numbering follows the driver's [`HookConvention`](crate::HookConvention).
/// By default epochs and batches are zero-based and batch numbers restart at
/// every epoch and every evaluation pass.
///
/// To stop training, a callback returns `true` from [`Callback::should_stop`];
/// the loop polls it between steps.
///
/// # Example
///
/// ```
/// use tensorlogic_callbacks::{Callback, CallbackContext, CallbackResult, Logs};
///
/// struct LrDecay {
///     factor: f64,
/// }
///
/// impl Callback for LrDecay {
///     fn on_epoch_end(
///         &mut self,
///         ctx: &mut CallbackContext<'_>,
///         _epoch: usize,
///         _logs: &Logs,
///     ) -> CallbackResult<()> {
///         if let Some(lr) = ctx.model().learning_rate() {
///             ctx.model_mut().set_learning_rate(lr * self.factor)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Callback {
    /// Called once before the first epoch.
    fn on_train_begin(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called once after the last epoch, or when training terminates early.
    fn on_train_end(&mut self, _ctx: &mut CallbackContext<'_>, _logs: &Logs) -> CallbackResult<()> {
        Ok(())
    }

    /// Called at the beginning of an epoch.
    fn on_epoch_begin(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _epoch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called at the end of an epoch. `logs` may hold aggregated epoch metrics.
    fn on_epoch_end(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _epoch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called before a training batch.
    fn on_train_batch_begin(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called after the forward pass and loss of a training batch.
    fn on_train_batch_end(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called after gradient computation, before the optimizer step.
    fn on_backward_end(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _batch: usize,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called before an evaluation batch.
    fn on_test_batch_begin(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called after an evaluation batch.
    fn on_test_batch_end(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called at the beginning of an evaluation pass.
    fn on_test_begin(
        &mut self,
        _ctx: &mut CallbackContext<'_>,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        Ok(())
    }

    /// Called at the end of an evaluation pass.
    fn on_test_end(&mut self, _ctx: &mut CallbackContext<'_>, _logs: &Logs) -> CallbackResult<()> {
        Ok(())
    }

    /// Check if training should stop early.
    fn should_stop(&self) -> bool {
        false
    }

    /// Name used in log records and errors.
    fn name(&self) -> &str {
        "Callback"
    }
}
