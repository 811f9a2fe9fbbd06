//! Integration tests for tensorlogic-callbacks
//!
//! These tests drive callbacks through a small hand-written loop and verify
//! the hook call sequence a training loop produces.

use scirs2_core::ndarray::{Array, Array2, Ix2};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tensorlogic_callbacks::{
    Callback, CallbackContext, CallbackError, CallbackList, CallbackResult, Hook, HookConvention,
    HookSequencer, LambdaCallback, Logs, Model, SequencerConfig, TrainingParams,
};

type Events = Rc<RefCell<Vec<(Hook, Option<usize>)>>>;

struct Regressor {
    params: HashMap<String, Array<f64, Ix2>>,
    lr: f64,
}

impl Regressor {
    fn new() -> Self {
        let mut params = HashMap::new();
        params.insert("weights".to_string(), Array2::from_elem((4, 1), 0.5));
        params.insert("bias".to_string(), Array2::zeros((1, 1)));
        Self { params, lr: 0.1 }
    }
}

impl Model for Regressor {
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

/// Records every hook and checks that params and model are reachable.
struct Recorder {
    events: Events,
    expected_epochs: usize,
}

impl Recorder {
    fn new(events: &Events, expected_epochs: usize) -> Self {
        Self {
            events: Rc::clone(events),
            expected_epochs,
        }
    }

    fn record(
        &self,
        ctx: &CallbackContext<'_>,
        hook: Hook,
        number: Option<usize>,
    ) -> CallbackResult<()> {
        if ctx.params().epochs() != self.expected_epochs {
            return Err(CallbackError::failed("params not visible"));
        }
        if ctx.model().num_parameters() == 0 {
            return Err(CallbackError::failed("model not visible"));
        }
        self.events.borrow_mut().push((hook, number));
        Ok(())
    }
}

impl Callback for Recorder {
    fn on_train_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::TrainBegin, None)
    }

    fn on_train_end(&mut self, ctx: &mut CallbackContext<'_>, _logs: &Logs) -> CallbackResult<()> {
        self.record(ctx, Hook::TrainEnd, None)
    }

    fn on_epoch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::EpochBegin, Some(epoch))
    }

    fn on_epoch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        epoch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::EpochEnd, Some(epoch))
    }

    fn on_train_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::TrainBatchBegin, Some(batch))
    }

    fn on_train_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::TrainBatchEnd, Some(batch))
    }

    fn on_backward_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::BackwardEnd, Some(batch))
    }

    fn on_test_batch_begin(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::TestBatchBegin, Some(batch))
    }

    fn on_test_batch_end(
        &mut self,
        ctx: &mut CallbackContext<'_>,
        batch: usize,
        _logs: &Logs,
    ) -> CallbackResult<()> {
        self.record(ctx, Hook::TestBatchEnd, Some(batch))
    }

    fn on_test_begin(&mut self, ctx: &mut CallbackContext<'_>, _logs: &Logs) -> CallbackResult<()> {
        self.record(ctx, Hook::TestBegin, None)
    }

    fn on_test_end(&mut self, ctx: &mut CallbackContext<'_>, _logs: &Logs) -> CallbackResult<()> {
        self.record(ctx, Hook::TestEnd, None)
    }

    fn name(&self) -> &str {
        "Recorder"
    }
}

/// Minimal loop: fake forward/backward, optional validation pass, early stop.
fn fit(
    seq: &mut HookSequencer,
    model: &mut dyn Model,
    validation_batches: usize,
) -> CallbackResult<usize> {
    let epochs = seq.params().epochs();
    let steps = seq.params().steps_per_epoch();

    seq.run(model, &Logs::new(), |seq, model| {
        let mut completed = 0;
        for epoch in 0..epochs {
            seq.epoch_begin(model, epoch, &Logs::new())?;

            let mut epoch_loss = 0.0;
            for batch in 0..steps {
                seq.train_batch_begin(model, batch, &Logs::new().with_scalar("size", 32.0))?;
                let loss = 1.0 / (1.0 + (epoch * steps + batch) as f64);
                seq.backward_end(model, batch)?;
                epoch_loss += loss;
                seq.train_batch_end(model, batch, &Logs::new().with_scalar("loss", loss))?;
            }

            let mut epoch_logs = Logs::new().with_scalar("loss", epoch_loss / steps as f64);
            if validation_batches > 0 {
                seq.test_begin(model, &Logs::new())?;
                for batch in 0..validation_batches {
                    seq.test_batch_begin(model, batch, &Logs::new())?;
                    seq.test_batch_end(model, batch, &Logs::new().with_scalar("loss", 0.5))?;
                }
                seq.test_end(model, &Logs::new().with_scalar("val_loss", 0.5))?;
                epoch_logs.insert("val_loss", 0.5);
            }

            seq.epoch_end(model, epoch, &epoch_logs)?;
            completed += 1;
            if seq.stop_requested() {
                break;
            }
        }
        Ok(completed)
    })
}

fn epoch_events(events: &Events) -> Vec<(&'static str, usize)> {
    events
        .borrow()
        .iter()
        .filter_map(|(hook, number)| match hook {
            Hook::EpochBegin => number.map(|n| ("begin", n)),
            Hook::EpochEnd => number.map(|n| ("end", n)),
            _ => None,
        })
        .collect()
}

/// Test: epoch hooks record begin/end pairs in order
#[test]
fn test_two_epoch_scenario() -> Result<(), CallbackError> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let begin = Rc::clone(&seen);
    let end = Rc::clone(&seen);
    let callback = LambdaCallback::new("epoch_log")
        .epoch_begin(move |_ctx, epoch, _logs| {
            begin.borrow_mut().push(("begin", epoch));
            Ok(())
        })
        .epoch_end(move |_ctx, epoch, _logs| {
            end.borrow_mut().push(("end", epoch));
            Ok(())
        });

    let params = TrainingParams::new(2, 3)?;
    let mut seq = HookSequencer::new(params, CallbackList::new().with(callback));
    let mut model = Regressor::new();
    fit(&mut seq, &mut model, 0)?;

    assert_eq!(
        *seen.borrow(),
        vec![("begin", 0), ("end", 0), ("begin", 1), ("end", 1)]
    );
    Ok(())
}

/// Test: full run produces the documented hook order
#[test]
fn test_full_hook_order() -> Result<(), CallbackError> {
    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let params = TrainingParams::new(2, 2)?.with_validation_steps(1)?;
    let mut seq = HookSequencer::new(params, CallbackList::new().with(Recorder::new(&events, 2)));
    let mut model = Regressor::new();

    fit(&mut seq, &mut model, 1)?;

    let mut expected = vec![(Hook::TrainBegin, None)];
    for epoch in 0..2 {
        expected.push((Hook::EpochBegin, Some(epoch)));
        for batch in 0..2 {
            expected.push((Hook::TrainBatchBegin, Some(batch)));
            expected.push((Hook::BackwardEnd, Some(batch)));
            expected.push((Hook::TrainBatchEnd, Some(batch)));
        }
        expected.push((Hook::TestBegin, None));
        expected.push((Hook::TestBatchBegin, Some(0)));
        expected.push((Hook::TestBatchEnd, Some(0)));
        expected.push((Hook::TestEnd, None));
        expected.push((Hook::EpochEnd, Some(epoch)));
    }
    expected.push((Hook::TrainEnd, None));

    assert_eq!(*events.borrow(), expected);
    Ok(())
}

/// Test: on_backward_end fires once per batch, between batch begin and end
#[test]
fn test_backward_end_once_per_batch() -> Result<(), CallbackError> {
    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let params = TrainingParams::new(3, 4)?;
    let mut seq = HookSequencer::new(params, CallbackList::new().with(Recorder::new(&events, 3)));
    let mut model = Regressor::new();
    fit(&mut seq, &mut model, 0)?;

    let events = events.borrow();
    let backward_count = events
        .iter()
        .filter(|(hook, _)| *hook == Hook::BackwardEnd)
        .count();
    assert_eq!(backward_count, 12);

    for (i, (hook, number)) in events.iter().enumerate() {
        if *hook == Hook::BackwardEnd {
            assert_eq!(events[i - 1], (Hook::TrainBatchBegin, *number));
            assert_eq!(events[i + 1], (Hook::TrainBatchEnd, *number));
        }
    }
    Ok(())
}

/// Test: early stop still closes the run with on_train_end
#[test]
fn test_train_end_after_early_stop() -> Result<(), CallbackError> {
    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let stop = Rc::new(RefCell::new(false));
    let trigger = Rc::clone(&stop);
    let probe = Rc::clone(&stop);

    let callbacks = CallbackList::new()
        .with(Recorder::new(&events, 10))
        .with(
            LambdaCallback::new("stop_after_first_epoch")
                .epoch_end(move |_ctx, _epoch, _logs| {
                    *trigger.borrow_mut() = true;
                    Ok(())
                })
                .stop_when(move || *probe.borrow()),
        );

    let mut seq = HookSequencer::new(TrainingParams::new(10, 2)?, callbacks);
    let mut model = Regressor::new();
    let completed = fit(&mut seq, &mut model, 0)?;

    assert_eq!(completed, 1);
    assert_eq!(epoch_events(&events), vec![("begin", 0), ("end", 0)]);
    assert_eq!(events.borrow().last(), Some(&(Hook::TrainEnd, None)));
    assert_eq!(
        events
            .borrow()
            .iter()
            .filter(|(hook, _)| *hook == Hook::TrainBegin)
            .count(),
        1
    );
    Ok(())
}

/// Test: a failing hook propagates, and on_train_end is still delivered
#[test]
fn test_train_end_after_failing_hook() -> Result<(), CallbackError> {
    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let callbacks = CallbackList::new()
        .with(Recorder::new(&events, 3))
        .with(LambdaCallback::new("fragile").epoch_begin(|_ctx, epoch, _logs| {
            if epoch == 1 {
                Err(CallbackError::failed("cannot start epoch 1"))
            } else {
                Ok(())
            }
        }));

    let mut seq = HookSequencer::new(TrainingParams::new(3, 1)?, callbacks);
    let mut model = Regressor::new();
    let err = fit(&mut seq, &mut model, 0).unwrap_err();

    match &err {
        CallbackError::Hook { hook, callback, .. } => {
            assert_eq!(*hook, Hook::EpochBegin);
            assert_eq!(callback, "fragile");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), CallbackError::Failed(_)));
    assert_eq!(events.borrow().last(), Some(&(Hook::TrainEnd, None)));
    assert!(!seq.is_running());
    Ok(())
}

/// Test: callbacks may mutate the model through the context
#[test]
fn test_callback_adjusts_learning_rate() -> Result<(), CallbackError> {
    let decay = LambdaCallback::new("step_decay").epoch_end(|ctx, _epoch, _logs| {
        let lr = ctx.model().learning_rate().unwrap_or(0.0);
        ctx.model_mut().set_learning_rate(lr * 0.5)
    });

    let mut seq = HookSequencer::new(TrainingParams::new(3, 2)?, CallbackList::new().with(decay));
    let mut model = Regressor::new();
    fit(&mut seq, &mut model, 0)?;

    approx::assert_relative_eq!(model.lr, 0.0125);
    Ok(())
}

/// Test: on_train_end receives the last epoch's logs
#[test]
fn test_train_end_receives_last_epoch_logs() -> Result<(), CallbackError> {
    let final_logs = Rc::new(RefCell::new(Logs::new()));
    let sink = Rc::clone(&final_logs);
    let callback = LambdaCallback::new("final").train_end(move |_ctx, logs| {
        *sink.borrow_mut() = logs.clone();
        Ok(())
    });

    let params = TrainingParams::new(2, 1)?.with_validation_steps(2)?;
    let mut seq = HookSequencer::new(params, CallbackList::new().with(callback));
    let mut model = Regressor::new();
    fit(&mut seq, &mut model, 2)?;

    let logs = final_logs.borrow();
    assert_eq!(logs.scalar("val_loss"), Some(0.5));
    approx::assert_relative_eq!(logs.scalar("loss").unwrap(), (1.0 / 2.0 + 0.0) / 1.0);
    Ok(())
}

/// Test: a loop that violates the contract is rejected before dispatch
#[test]
fn test_contract_violation_is_reported() -> Result<(), CallbackError> {
    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let mut seq = HookSequencer::new(
        TrainingParams::new(2, 2)?,
        CallbackList::new().with(Recorder::new(&events, 2)),
    );
    let mut model = Regressor::new();

    let result = seq.run(&mut model, &Logs::new(), |seq, model| {
        seq.epoch_begin(model, 0, &Logs::new())?;
        seq.train_batch_begin(model, 0, &Logs::new())?;
        // skips on_backward_end
        seq.train_batch_end(model, 0, &Logs::new())
    });

    let err = result.unwrap_err();
    assert!(err.is_contract_violation());
    let events = events.borrow();
    assert!(!events.contains(&(Hook::TrainBatchEnd, Some(0))));
    assert_eq!(events.last(), Some(&(Hook::TrainEnd, None)));
    Ok(())
}

/// Test: configuration and params loaded from JSON drive a one-based loop
#[test]
fn test_one_based_loop_from_json() -> Result<(), CallbackError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("params.json");
    std::fs::write(&path, r#"{"epochs": 2, "steps_per_epoch": 2}"#)?;

    let params = TrainingParams::from_json_file(&path)?;
    let config = SequencerConfig::from_json_str(
        r#"{"convention": {"epoch_base": "one", "batch_base": "one"}}"#,
    )?;
    assert_eq!(config.convention, HookConvention::one_based());

    let events: Events = Rc::new(RefCell::new(Vec::new()));
    let mut seq = HookSequencer::with_config(
        params,
        CallbackList::new().with(Recorder::new(&events, 2)),
        config,
    );
    let mut model = Regressor::new();

    seq.run(&mut model, &Logs::new(), |seq, model| {
        for epoch in 1..=2 {
            seq.epoch_begin(model, epoch, &Logs::new())?;
            for batch in 1..=2 {
                seq.train_batch_begin(model, batch, &Logs::new())?;
                seq.backward_end(model, batch)?;
                seq.train_batch_end(model, batch, &Logs::new())?;
            }
            seq.epoch_end(model, epoch, &Logs::new())?;
        }
        Ok(())
    })?;

    assert_eq!(
        epoch_events(&events),
        vec![("begin", 1), ("end", 1), ("begin", 2), ("end", 2)]
    );
    Ok(())
}
