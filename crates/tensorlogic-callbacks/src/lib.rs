//! Training callbacks: the lifecycle-hook contract between a training loop
//! and user code.
//!
//! **Version**: 0.1.0-alpha.2 | **Status**: Alpha
//!
//! This crate provides the extension points of a Tensorlogic training loop:
//! - The [`Callback`] trait with default no-op hooks for train, epoch,
//!   train-batch, backward and evaluation events
//! - [`CallbackContext`] lending the run's [`TrainingParams`] and the
//!   [`Model`] to every hook
//! - [`Logs`], the transient metric mapping passed to hooks
//! - [`CallbackList`] for ordered dispatch and [`LambdaCallback`] for
//!   closure-based hooks
//! - [`HookSequencer`] for loops that want the call sequence checked
//!
//! The training loop, the optimizer and concrete callbacks live elsewhere.

mod callbacks;
mod error;
mod hook;
mod logs;
mod model;
mod params;
mod sequence;

#[cfg(feature = "structured-logging")]
pub mod structured_logging;

pub use callbacks::{Callback, CallbackContext, CallbackList, LambdaCallback};
pub use error::{CallbackError, CallbackResult};
pub use hook::Hook;
pub use logs::{LogValue, Logs};
pub use model::Model;
pub use params::TrainingParams;
pub use sequence::{BatchScope, HookConvention, HookSequencer, IndexBase, SequencerConfig};
