//! Driving callbacks from a hand-written training loop.
//!
//! This example demonstrates:
//! - Implementing the `Callback` trait for a progress printer
//! - Closure hooks with `LambdaCallback`
//! - Reading and adjusting the model from inside a hook
//! - Letting `HookSequencer` check the call order and close the run

use scirs2_core::ndarray::{s, Array, Array2, Ix2};
use std::collections::HashMap;
use tensorlogic_callbacks::{
    Callback, CallbackContext, CallbackList, CallbackResult, HookSequencer, LambdaCallback, Logs,
    Model, TrainingParams,
};

struct LinearRegressor {
    params: HashMap<String, Array<f64, Ix2>>,
    lr: f64,
}

impl Model for LinearRegressor {
    fn parameters(&self) -> &HashMap<String, Array<f64, Ix2>> {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>> {
        &mut self.params
    }

    fn learning_rate(&self) -> Option<f64> {
        Some(self.lr)
    }

    fn set_learning_rate(&mut self, lr: f64) -> CallbackResult<()> {
        self.lr = lr;
        Ok(())
    }
}

struct Progress;

impl Callback for Progress {
    fn on_train_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        println!(
            "Training {} epochs x {} steps ({} parameters)",
            ctx.params().epochs(),
            ctx.params().steps_per_epoch(),
            ctx.model().num_parameters()
        );
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        logs: &Logs,
    ) -> CallbackResult<()> {
        println!(
            "Epoch {}/{}: loss={:.6}, lr={:.5}",
            epoch + 1,
            ctx.params().epochs(),
            logs.scalar("loss").unwrap_or(f64::NAN),
            ctx.model().learning_rate().unwrap_or(f64::NAN)
        );
        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &mut CallbackContext<'_>, logs: &Logs) -> CallbackResult<()> {
        println!("Done. Final loss: {:.6}", logs.scalar("loss").unwrap_or(f64::NAN));
        Ok(())
    }

    fn name(&self) -> &str {
        "Progress"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Hook Sequence ===\n");

    // Synthetic data: y = 2x + 1
    let inputs = Array2::from_shape_fn((64, 1), |(i, _)| i as f64 / 64.0);
    let targets = inputs.mapv(|x| 2.0 * x + 1.0);

    let mut params = HashMap::new();
    params.insert("weight".to_string(), Array2::zeros((1, 1)));
    params.insert("bias".to_string(), Array2::zeros((1, 1)));
    let mut model = LinearRegressor { params, lr: 0.5 };

    let batch_size = 16;
    let training = TrainingParams::new(8, inputs.nrows() / batch_size)?;

    let callbacks = CallbackList::new()
        .with(Progress)
        .with(LambdaCallback::new("lr_decay").epoch_end(|ctx, epoch, _logs| {
            if epoch % 3 == 2 {
                let lr = ctx.model().learning_rate().unwrap_or(0.0);
                ctx.model_mut().set_learning_rate(lr * 0.5)?;
            }
            Ok(())
        }));

    let mut seq = HookSequencer::new(training, callbacks);
    let epochs = training.epochs();
    let steps = training.steps_per_epoch();

    seq.run(&mut model, &Logs::new(), |seq, model| {
        for epoch in 0..epochs {
            seq.epoch_begin(model, epoch, &Logs::new())?;
            let mut epoch_loss = 0.0;

            for batch in 0..steps {
                seq.train_batch_begin(model, batch, &Logs::new())?;

                let rows = batch * batch_size..(batch + 1) * batch_size;
                let x = inputs.slice(s![rows.clone(), ..]);
                let y = targets.slice(s![rows, ..]);

                let w = model.parameters()["weight"][[0, 0]];
                let b = model.parameters()["bias"][[0, 0]];
                let err = x.mapv(|v| w * v + b) - &y;
                let loss = err.mapv(|e| e * e).mean().unwrap_or(0.0);
                let grad_w = 2.0 * (&err * &x).mean().unwrap_or(0.0);
                let grad_b = 2.0 * err.mean().unwrap_or(0.0);
                seq.backward_end(model, batch)?;

                let lr = model.learning_rate().unwrap_or(0.0);
                let params = model.parameters_mut();
                if let Some(weight) = params.get_mut("weight") {
                    weight[[0, 0]] -= lr * grad_w;
                }
                if let Some(bias) = params.get_mut("bias") {
                    bias[[0, 0]] -= lr * grad_b;
                }

                epoch_loss += loss;
                seq.train_batch_end(model, batch, &Logs::new().with_scalar("loss", loss))?;
            }

            let logs = Logs::new().with_scalar("loss", epoch_loss / steps as f64);
            seq.epoch_end(model, epoch, &logs)?;
        }
        Ok(())
    })?;

    println!(
        "\nLearned weight={:.3}, bias={:.3}",
        model.parameters()["weight"][[0, 0]],
        model.parameters()["bias"][[0, 0]]
    );
    Ok(())
}
