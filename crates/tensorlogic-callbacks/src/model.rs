//! Model handle exposed to callbacks.

use crate::{CallbackError, CallbackResult};
use scirs2_core::ndarray::{Array, Ix2};
use std::collections::HashMap;

/// Trainable model as seen from a callback.
///
/// The training loop owns the model and lends it to each hook through
/// [`CallbackContext`](crate::CallbackContext). Callbacks may inspect and
/// mutate it (parameters, learning rate) but never own it.
pub trait Model {
    /// Get a reference to the model's parameters.
    fn parameters(&self) -> &HashMap<String, Array<f64, Ix2>>;

    /// Get a mutable reference to the model's parameters.
    fn parameters_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>>;

    /// Get the number of scalar parameters in the model.
    fn num_parameters(&self) -> usize {
        self.parameters().values().map(|p| p.len()).sum()
    }

    /// Current learning rate of the attached optimizer, if any.
    fn learning_rate(&self) -> Option<f64> {
        None
    }

    /// Change the learning rate of the attached optimizer.
    fn set_learning_rate(&mut self, _lr: f64) -> CallbackResult<()> {
        Err(CallbackError::Unsupported(
            "model has no adjustable learning rate".to_string(),
        ))
    }

    /// Save model state to a dictionary.
    fn state_dict(&self) -> HashMap<String, Vec<f64>> {
        self.parameters()
            .iter()
            .map(|(name, param)| (name.clone(), param.iter().copied().collect()))
            .collect()
    }

    /// Load model state from a dictionary.
    ///
    /// Every entry must name an existing parameter of the same size. Entries
    /// are all checked before any is written, so a rejected state leaves the
    /// model untouched.
    fn load_state_dict(&mut self, state: HashMap<String, Vec<f64>>) -> CallbackResult<()> {
        let parameters = self.parameters_mut();

        for (name, values) in &state {
            let param = parameters.get(name).ok_or_else(|| {
                CallbackError::InvalidParameter(format!("Parameter '{}' not found in model", name))
            })?;

            if param.len() != values.len() {
                return Err(CallbackError::InvalidParameter(format!(
                    "Parameter '{}' size mismatch: expected {}, got {}",
                    name,
                    param.len(),
                    values.len()
                )));
            }
        }

        for (name, values) in state {
            if let Some(param) = parameters.get_mut(&name) {
                for (p, v) in param.iter_mut().zip(values) {
                    *p = v;
                }
            }
        }

        Ok(())
    }
}
