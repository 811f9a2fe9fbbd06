//! Closure-backed callbacks.

use crate::callbacks::core::{Callback, CallbackContext};
use crate::{CallbackResult, Logs};

type RunHook = Box<dyn FnMut(&mut CallbackContext<'_>, &Logs) -> CallbackResult<()>>;
type NumberedHook = Box<dyn FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()>>;
type BackwardHook = Box<dyn FnMut(&mut CallbackContext<'_>, usize) -> CallbackResult<()>>;

/// Callback assembled from optional closures, one slot per hook.
///
/// Slots left empty behave like the default no-op hooks.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tensorlogic_callbacks::{CallbackList, LambdaCallback};
///
/// let batches = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&batches);
///
/// let mut callbacks = CallbackList::new();
/// callbacks.add(Box::new(
///     LambdaCallback::new("batch_counter").train_batch_end(move |_ctx, _batch, _logs| {
///         counter.set(counter.get() + 1);
///         Ok(())
///     }),
/// ));
/// ```
#[derive(Default)]
pub struct LambdaCallback {
    name: String,
    train_begin: Option<RunHook>,
    train_end: Option<RunHook>,
    epoch_begin: Option<NumberedHook>,
    epoch_end: Option<NumberedHook>,
    train_batch_begin: Option<NumberedHook>,
    train_batch_end: Option<NumberedHook>,
    backward_end: Option<BackwardHook>,
    test_batch_begin: Option<NumberedHook>,
    test_batch_end: Option<NumberedHook>,
    test_begin: Option<RunHook>,
    test_end: Option<RunHook>,
    stop_when: Option<Box<dyn Fn() -> bool>>,
}

impl LambdaCallback {
    /// Create a callback with every slot empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the `on_train_begin` closure.
    pub fn train_begin<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, &Logs) -> CallbackResult<()> + 'static,
    {
        self.train_begin = Some(Box::new(f));
        self
    }

    /// Set the `on_train_end` closure.
    pub fn train_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, &Logs) -> CallbackResult<()> + 'static,
    {
        self.train_end = Some(Box::new(f));
        self
    }

    /// Set the `on_epoch_begin` closure.
    pub fn epoch_begin<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.epoch_begin = Some(Box::new(f));
        self
    }

    /// Set the `on_epoch_end` closure.
    pub fn epoch_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.epoch_end = Some(Box::new(f));
        self
    }

    /// Set the `on_train_batch_begin` closure.
    pub fn train_batch_begin<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.train_batch_begin = Some(Box::new(f));
        self
    }

    /// Set the `on_train_batch_end` closure.
    pub fn train_batch_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.train_batch_end = Some(Box::new(f));
        self
    }

    /// Set the `on_backward_end` closure.
    pub fn backward_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize) -> CallbackResult<()> + 'static,
    {
        self.backward_end = Some(Box::new(f));
        self
    }

    /// Set the `on_test_batch_begin` closure.
    pub fn test_batch_begin<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.test_batch_begin = Some(Box::new(f));
        self
    }

    /// Set the `on_test_batch_end` closure.
    pub fn test_batch_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, usize, &Logs) -> CallbackResult<()> + 'static,
    {
        self.test_batch_end = Some(Box::new(f));
        self
    }

    /// Set the `on_test_begin` closure.
    pub fn test_begin<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, &Logs) -> CallbackResult<()> + 'static,
    {
        self.test_begin = Some(Box::new(f));
        self
    }

    /// Set the `on_test_end` closure.
    pub fn test_end<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut CallbackContext<'_>, &Logs) -> CallbackResult<()> + 'static,
    {
        self.test_end = Some(Box::new(f));
        self
    }

    /// Set the predicate polled by [`Callback::should_stop`].
    pub fn stop_when<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.stop_when = Some(Box::new(f));
        self
    }
}

impl Callback for LambdaCallback {
    fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        match self.train_begin.as_mut() {
            Some(f) => f(ctx, logs),
            None => Ok(()),
        }
    }

    fn on_train_end(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        match self.train_end.as_mut() {
            Some(f) => f(ctx, logs),
            None => Ok(()),
        }
    }

    fn on_epoch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.epoch_begin.as_mut() {
            Some(f) => f(ctx, epoch, logs),
            None => Ok(()),
        }
    }

    fn on_epoch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.epoch_end.as_mut() {
            Some(f) => f(ctx, epoch, logs),
            None => Ok(()),
        }
    }

    fn on_train_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.train_batch_begin.as_mut() {
            Some(f) => f(ctx, batch, logs),
            None => Ok(()),
        }
    }

    fn on_train_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.train_batch_end.as_mut() {
            Some(f) => f(ctx, batch, logs),
            None => Ok(()),
        }
    }

    fn on_backward_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
    ) -> CallbackResult<()> {
        match self.backward_end.as_mut() {
            Some(f) => f(ctx, batch),
            None => Ok(()),
        }
    }

    fn on_test_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.test_batch_begin.as_mut() {
            Some(f) => f(ctx, batch, logs),
            None => Ok(()),
        }
    }

    fn on_test_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        match self.test_batch_end.as_mut() {
            Some(f) => f(ctx, batch, logs),
            None => Ok(()),
        }
    }

    fn on_test_begin(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        match self.test_begin.as_mut() {
            Some(f) => f(ctx, logs),
            None => Ok(()),
        }
    }

    fn on_test_end(&mut self, ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        match self.test_end.as_mut() {
            Some(f) => f(ctx, logs),
            None => Ok(()),
        }
    }

    fn should_stop(&self) -> bool {
        self.stop_when.as_ref().is_some_and(|f| f())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
