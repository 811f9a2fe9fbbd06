//! Training parameters shared with every callback.

use crate::{CallbackError, CallbackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of a training run, fixed before the first hook fires.
///
/// The training loop builds this once and lends it to every hook through
/// [`CallbackContext`](crate::CallbackContext). Fields are private so a
/// callback cannot change them mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrainingParams")]
pub struct TrainingParams {
    epochs: usize,
    steps_per_epoch: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation_steps: Option<usize>,
}

#[derive(Deserialize)]
struct RawTrainingParams {
    epochs: usize,
    steps_per_epoch: usize,
    #[serde(default)]
    validation_steps: Option<usize>,
}

impl TryFrom<RawTrainingParams> for TrainingParams {
    type Error = CallbackError;

    fn try_from(raw: RawTrainingParams) -> CallbackResult<Self> {
        let params = Self::new(raw.epochs, raw.steps_per_epoch)?;
        match raw.validation_steps {
            Some(steps) => params.with_validation_steps(steps),
            None => Ok(params),
        }
    }
}

impl TrainingParams {
    /// Create training parameters.
    ///
    /// # Arguments
    /// * `epochs` - Total number of planned epochs
    /// * `steps_per_epoch` - Number of training batches per epoch
    pub fn new(epochs: usize, steps_per_epoch: usize) -> CallbackResult<Self> {
        if epochs == 0 {
            return Err(CallbackError::InvalidParams(
                "epochs must be at least 1".to_string(),
            ));
        }
        if steps_per_epoch == 0 {
            return Err(CallbackError::InvalidParams(
                "steps_per_epoch must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            epochs,
            steps_per_epoch,
            validation_steps: None,
        })
    }

    /// Set the number of batches in one evaluation pass.
    pub fn with_validation_steps(mut self, steps: usize) -> CallbackResult<Self> {
        if steps == 0 {
            return Err(CallbackError::InvalidParams(
                "validation_steps must be at least 1".to_string(),
            ));
        }
        self.validation_steps = Some(steps);
        Ok(self)
    }

    /// Total number of planned epochs.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Number of training batches per epoch.
    pub fn steps_per_epoch(&self) -> usize {
        self.steps_per_epoch
    }

    /// Number of batches per evaluation pass, if known.
    pub fn validation_steps(&self) -> Option<usize> {
        self.validation_steps
    }

    /// Total number of training batches over the whole run.
    pub fn total_steps(&self) -> usize {
        self.epochs.saturating_mul(self.steps_per_epoch)
    }

    /// Parse parameters from a JSON document.
    pub fn from_json_str(json: &str) -> CallbackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> CallbackResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}
