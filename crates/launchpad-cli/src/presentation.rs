//! Terminal output: tables and pipeline progress.

use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use launchpad_core::{
    EntityHandle, InstallEvent, InstallEventEmitter, InstallableEntity, PipelineOutcome, Progress,
};
use launchpad_install::InstallationOrchestrator;

use crate::error::CliError;

// ============================================================================
// Tables
// ============================================================================

pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Truncate to at most `max` characters, marking the cut with `...`.
pub fn truncate_string(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

// ============================================================================
// Outcome log
// ============================================================================

/// Keeps the last pipeline outcome of every entity so a command can report
/// why its pipeline failed.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    outcomes: Mutex<HashMap<EntityHandle, PipelineOutcome>>,
}

impl OutcomeLog {
    pub fn take(&self, handle: EntityHandle) -> Option<PipelineOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
    }
}

impl InstallEventEmitter for OutcomeLog {
    fn emit(&self, event: InstallEvent) {
        if let InstallEvent::PipelineFinished {
            handle, outcome, ..
        } = event
        {
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(handle, outcome);
        }
    }
}

// ============================================================================
// Pipeline watcher
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const BAR_LENGTH: u64 = 1000;

fn progress_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::new(BAR_LENGTH);
    if io::stderr().is_terminal() {
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
    } else {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    bar.set_prefix(name.to_string());
    bar
}

fn step_message(entity: &InstallableEntity) -> String {
    let p: &Progress = &entity.progress;
    let mut msg = format!("{} ({}/{})", entity.state, p.completed_steps, p.total_steps);
    if !p.step_name.is_empty() {
        msg.push_str(": ");
        msg.push_str(&p.step_name);
    }
    if p.total_objects > 0 {
        msg.push_str(&format!(" {}/{}", p.received_objects, p.total_objects));
    }
    msg
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn bar_position(progress: &Progress) -> u64 {
    (f64::from(progress.percent()) * BAR_LENGTH as f64) as u64
}

/// Render the entity's progress until every queued pipeline has finished.
///
/// Ctrl-C cancels all running pipelines and keeps waiting for them to wind
/// down; the result is then [`CliError::Interrupted`].
pub async fn watch(
    orchestrator: &InstallationOrchestrator,
    handle: EntityHandle,
    name: &str,
) -> Result<Option<InstallableEntity>, CliError> {
    let bar = progress_bar(name);
    let idle = orchestrator.wait_idle();
    tokio::pin!(idle);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut interrupted = false;

    loop {
        tokio::select! {
            () = &mut idle => break,
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                let canceled = orchestrator.cancel_all();
                bar.println(format!("canceling {canceled} pipeline(s)..."));
            }
            _ = ticker.tick() => {
                if let Ok(entity) = orchestrator.get(handle) {
                    bar.set_position(bar_position(&entity.progress));
                    bar.set_message(step_message(&entity));
                }
            }
        }
    }
    bar.finish_and_clear();

    if interrupted {
        return Err(CliError::Interrupted);
    }
    Ok(orchestrator.get(handle).ok())
}
