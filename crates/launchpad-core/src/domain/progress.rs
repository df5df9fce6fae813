//! Pipeline progress record polled by the presentation layer.

use serde::{Deserialize, Serialize};

/// One fine-grained progress report from a running transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferUpdate {
    /// Human-readable phase, e.g. "Receiving objects".
    pub stage: String,
    pub received: u64,
    pub total: u64,
    /// Completion of the whole transfer in `0.0..=1.0`, weighted across phases.
    pub fraction: f32,
}

impl TransferUpdate {
    pub fn new(stage: impl Into<String>, received: u64, total: u64, fraction: f32) -> Self {
        Self {
            stage: stage.into(),
            received,
            total,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

/// Step counts, step label and transfer counters for one entity.
///
/// Percent is `(completed_steps + step_fraction) / total_steps`. The step
/// fraction only ever grows within a step and is zeroed when the step
/// completes, so the percent never decreases during one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub total_steps: u32,
    pub completed_steps: u32,
    pub step_name: String,
    pub received_objects: u64,
    pub total_objects: u64,
    pub cancel_requested: bool,
    step_fraction: f32,
}

impl Progress {
    /// Zero everything, including the cancel flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reset and announce the number of steps for a new pipeline run.
    pub fn begin(&mut self, total_steps: u32) {
        self.reset();
        self.total_steps = total_steps;
    }

    pub fn set_step(&mut self, name: impl Into<String>) {
        self.step_name = name.into();
    }

    /// Fold a transfer report into the current step.
    pub fn apply_transfer(&mut self, update: &TransferUpdate) {
        self.step_name.clone_from(&update.stage);
        self.received_objects = update.received;
        self.total_objects = update.total;
        if update.fraction > self.step_fraction {
            self.step_fraction = update.fraction;
        }
    }

    /// Mark the current step done and clear its fine counters.
    pub fn complete_step(&mut self) {
        if self.completed_steps < self.total_steps {
            self.completed_steps += 1;
        }
        self.step_fraction = 0.0;
        self.received_objects = 0;
        self.total_objects = 0;
    }

    #[must_use]
    pub const fn step_fraction(&self) -> f32 {
        self.step_fraction
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total_steps > 0 && self.completed_steps == self.total_steps
    }

    /// Overall completion in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f32 {
        if self.total_steps == 0 {
            return 0.0;
        }
        let done = self.completed_steps as f32 + self.step_fraction;
        (done / self.total_steps as f32).clamp(0.0, 1.0)
    }
}
