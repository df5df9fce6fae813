//! Bridge from transfer progress to the registry.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use launchpad_core::{EntityHandle, InstallEvent, TransferObserver, TransferUpdate};

use super::Context;

/// Shortest gap between two progress events for one transfer.
const EVENT_INTERVAL: Duration = Duration::from_millis(100);

/// Whether a progress event is due at `now`. The closing report of a
/// transfer is always due so front ends see it reach 100%.
fn event_due(last: &mut Option<Instant>, now: Instant, update: &TransferUpdate) -> bool {
    let due = update.fraction >= 1.0
        || last.is_none_or(|sent| now.duration_since(sent) >= EVENT_INTERVAL);
    if due {
        *last = Some(now);
    }
    due
}

/// Folds every transfer report into the entity's progress record. Events
/// are rate limited; the registry is always updated.
pub(super) struct RegistryObserver<'a> {
    ctx: &'a Context,
    handle: EntityHandle,
    last_event: Mutex<Option<Instant>>,
}

impl<'a> RegistryObserver<'a> {
    pub(super) const fn new(ctx: &'a Context, handle: EntityHandle) -> Self {
        Self {
            ctx,
            handle,
            last_event: Mutex::new(None),
        }
    }
}

impl TransferObserver for RegistryObserver<'_> {
    fn on_progress(&self, update: TransferUpdate) {
        let Ok(progress) = self.ctx.registry.update(self.handle, |e| {
            e.progress.apply_transfer(&update);
            e.progress.clone()
        }) else {
            return;
        };

        let due = event_due(
            &mut self.last_event.lock().unwrap_or_else(PoisonError::into_inner),
            Instant::now(),
            &update,
        );
        if due {
            self.ctx.emit(InstallEvent::Progress {
                handle: self.handle,
                progress,
            });
        }
    }
}
