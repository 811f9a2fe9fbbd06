//! Names of the lifecycle hooks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the lifecycle hooks of [`Callback`](crate::Callback).
///
/// Serialized under the same `on_*` name that `Display` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hook {
    /// `on_train_begin`
    #[serde(rename = "on_train_begin")]
    TrainBegin,
    /// `on_train_end`
    #[serde(rename = "on_train_end")]
    TrainEnd,
    /// `on_epoch_begin`
    #[serde(rename = "on_epoch_begin")]
    EpochBegin,
    /// `on_epoch_end`
    #[serde(rename = "on_epoch_end")]
    EpochEnd,
    /// `on_train_batch_begin`
    #[serde(rename = "on_train_batch_begin")]
    TrainBatchBegin,
    /// `on_train_batch_end`
    #[serde(rename = "on_train_batch_end")]
    TrainBatchEnd,
    /// `on_backward_end`
    #[serde(rename = "on_backward_end")]
    BackwardEnd,
    /// `on_test_batch_begin`
    #[serde(rename = "on_test_batch_begin")]
    TestBatchBegin,
    /// `on_test_batch_end`
    #[serde(rename = "on_test_batch_end")]
    TestBatchEnd,
    /// `on_test_begin`
    #[serde(rename = "on_test_begin")]
    TestBegin,
    /// `on_test_end`
    #[serde(rename = "on_test_end")]
    TestEnd,
}

impl Hook {
    /// All hooks, in the order they are declared on the trait.
    pub const ALL: [Hook; 11] = [
        Hook::TrainBegin,
        Hook::TrainEnd,
        Hook::EpochBegin,
        Hook::EpochEnd,
        Hook::TrainBatchBegin,
        Hook::TrainBatchEnd,
        Hook::BackwardEnd,
        Hook::TestBatchBegin,
        Hook::TestBatchEnd,
        Hook::TestBegin,
        Hook::TestEnd,
    ];

    /// Method name of the hook on the callback trait.
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::TrainBegin => "on_train_begin",
            Hook::TrainEnd => "on_train_end",
            Hook::EpochBegin => "on_epoch_begin",
            Hook::EpochEnd => "on_epoch_end",
            Hook::TrainBatchBegin => "on_train_batch_begin",
            Hook::TrainBatchEnd => "on_train_batch_end",
            Hook::BackwardEnd => "on_backward_end",
            Hook::TestBatchBegin => "on_test_batch_begin",
            Hook::TestBatchEnd => "on_test_batch_end",
            Hook::TestBegin => "on_test_begin",
            Hook::TestEnd => "on_test_end",
        }
    }

    /// Whether the hook receives a `Logs` payload.
    pub fn takes_logs(&self) -> bool {
        !matches!(self, Hook::BackwardEnd)
    }

    /// Whether the hook receives an epoch or batch number.
    pub fn is_numbered(&self) -> bool {
        matches!(
            self,
            Hook::EpochBegin
                | Hook::EpochEnd
                | Hook::TrainBatchBegin
                | Hook::TrainBatchEnd
                | Hook::BackwardEnd
                | Hook::TestBatchBegin
                | Hook::TestBatchEnd
        )
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
