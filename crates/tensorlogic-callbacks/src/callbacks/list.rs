//! Ordered collection of callbacks.

use crate::callbacks::core::{Callback, CallbackContext};
use crate::{CallbackError, CallbackResult, Hook, Logs};

/// List of callbacks to execute in registration order.
///
/// Each dispatch method calls the hook on every callback in turn and stops at
/// the first error, which is returned as [`CallbackError::Hook`] naming the
/// failing callback.
pub struct CallbackList {
    callbacks: Vec<Box<dyn Callback>>,
}

impl CallbackList {
    /// Create a new callback list.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a callback to the list.
    pub fn add(&mut self, callback: Box<dyn Callback>) {
        self.callbacks.push(callback);
    }

    /// Builder-style [`CallbackList::add`].
    pub fn with(mut self, callback: impl Callback + 'static) -> Self {
        self.add(Box::new(callback));
        self
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Names of the registered callbacks, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    fn dispatch<F>(&mut self, hook: Hook, mut call: F) -> CallbackResult<()>
    where
        F: FnMut(&mut dyn Callback) -> CallbackResult<()>,
    {
        for callback in &mut self.callbacks {
            log::trace!("{} -> {}", hook, callback.name());
            call(callback.as_mut()).map_err(|source| CallbackError::Hook {
                hook,
                callback: callback.name().to_string(),
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// Execute on_train_begin for all callbacks.
    pub fn on_train_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TrainBegin, |cb| cb.on_train_begin(ctx, logs))
    }

    /// Execute on_train_end for all callbacks.
    pub fn on_train_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TrainEnd, |cb| cb.on_train_end(ctx, logs))
    }

    /// Execute on_epoch_begin for all callbacks.
    pub fn on_epoch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::EpochBegin, |cb| cb.on_epoch_begin(ctx, epoch, logs))
    }

    /// Execute on_epoch_end for all callbacks.
    pub fn on_epoch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::EpochEnd, |cb| cb.on_epoch_end(ctx, epoch, logs))
    }

    /// Execute on_train_batch_begin for all callbacks.
    pub fn on_train_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TrainBatchBegin, |cb| {
            cb.on_train_batch_begin(ctx, batch, logs)
        })
    }

    /// Execute on_train_batch_end for all callbacks.
    pub fn on_train_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TrainBatchEnd, |cb| {
            cb.on_train_batch_end(ctx, batch, logs)
        })
    }

    /// Execute on_backward_end for all callbacks.
    pub fn on_backward_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::BackwardEnd, |cb| cb.on_backward_end(ctx, batch))
    }

    /// Execute on_test_batch_begin for all callbacks.
    pub fn on_test_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TestBatchBegin, |cb| {
            cb.on_test_batch_begin(ctx, batch, logs)
        })
    }

    /// Execute on_test_batch_end for all callbacks.
    pub fn on_test_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TestBatchEnd, |cb| {
            cb.on_test_batch_end(ctx, batch, logs)
        })
    }

    /// Execute on_test_begin for all callbacks.
    pub fn on_test_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TestBegin, |cb| cb.on_test_begin(ctx, logs))
    }

    /// Execute on_test_end for all callbacks.
    pub fn on_test_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        logs: &Logs,
    ) -> CallbackResult<()> {
        self.dispatch(Hook::TestEnd, |cb| cb.on_test_end(ctx, logs))
    }

    /// Check if any callback requests early stopping.
    pub fn should_stop(&self) -> bool {
        self.callbacks.iter().any(|cb| cb.should_stop())
    }
}

impl Default for CallbackList {
    fn default() -> Self {
        Self::new()
    }
}

impl Callback for CallbackList {
    fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        CallbackList::on_train_begin(self, ctx, logs)
    }

    fn on_train_end(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        CallbackList::on_train_end(self, ctx, logs)
    }

    fn on_epoch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_epoch_begin(self, ctx, epoch, logs)
    }

    fn on_epoch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_epoch_end(self, ctx, epoch, logs)
    }

    fn on_train_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_train_batch_begin(self, ctx, batch, logs)
    }

    fn on_train_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_train_batch_end(self, ctx, batch, logs)
    }

    fn on_backward_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
    ) -> CallbackResult<()> {
        CallbackList::on_backward_end(self, ctx, batch)
    }

    fn on_test_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_test_batch_begin(self, ctx, batch, logs)
    }

    fn on_test_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        CallbackList::on_test_batch_end(self, ctx, batch, logs)
    }

    fn on_test_begin(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        CallbackList::on_test_begin(self, ctx, logs)
    }

    fn on_test_end(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        CallbackList::on_test_end(self, ctx, logs)
    }

    fn should_stop(&self) -> bool {
        CallbackList::should_stop(self)
    }

    fn name(&self) -> &str {
        "CallbackList"
    }
}
