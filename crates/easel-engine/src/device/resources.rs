use std::sync::Arc;

use parking_lot::Mutex;

use super::manager::ChangedCallback;

/// Why create-resources callbacks are being raised.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CreateResourcesReason {
    /// First device for this control, or a handler added after resources existed.
    FirstTime,
    /// The previous device was lost and replaced.
    NewDevice,
    /// The display DPI changed; DPI-dependent resources should be rebuilt.
    DpiChanged,
}

/// Create-resources callback. Runs on the affinity thread.
pub type CreateResourcesHandler<D> = dyn FnMut(&CreateResourcesEventArgs<'_, D>) -> anyhow::Result<()>;

#[derive(Default)]
pub(crate) struct TrackerState {
    outstanding: usize,
    failure: Option<anyhow::Error>,
}

/// Completion state of one create-resources round.
#[derive(Clone, Default)]
pub(crate) struct ResourceTracker {
    state: Arc<Mutex<TrackerState>>,
}

pub(crate) enum TrackerStatus {
    Done,
    Outstanding,
    Failed(anyhow::Error),
}

impl ResourceTracker {
    /// Takes the round's status; a recorded failure is returned only once.
    pub(crate) fn take_status(&self) -> TrackerStatus {
        let mut state = self.state.lock();
        if let Some(err) = state.failure.take() {
            TrackerStatus::Failed(err)
        } else if state.outstanding > 0 {
            TrackerStatus::Outstanding
        } else {
            TrackerStatus::Done
        }
    }
}

/// Arguments passed to create-resources callbacks.
pub struct CreateResourcesEventArgs<'a, D> {
    device: &'a D,
    reason: CreateResourcesReason,
    tracker: &'a ResourceTracker,
    changed: Option<&'a ChangedCallback>,
}

impl<'a, D> CreateResourcesEventArgs<'a, D> {
    pub(crate) fn new(
        device: &'a D,
        reason: CreateResourcesReason,
        tracker: &'a ResourceTracker,
        changed: Option<&'a ChangedCallback>,
    ) -> Self {
        Self {
            device,
            reason,
            tracker,
            changed,
        }
    }

    pub fn device(&self) -> &D {
        self.device
    }

    pub fn reason(&self) -> CreateResourcesReason {
        self.reason
    }

    /// Defers completion of resource creation.
    ///
    /// Until every returned handle is completed, draw passes run with
    /// `RESOURCES_NOT_CREATED` and draw callbacks are not invoked.
    pub fn track_pending(&self) -> PendingResources {
        self.tracker.state.lock().outstanding += 1;
        PendingResources {
            tracker: self.tracker.clone(),
            changed: self.changed.cloned(),
            finished: false,
        }
    }
}

/// Outstanding resource creation, completable from any thread.
///
/// Dropping the handle without calling [`complete`](Self::complete) counts as a
/// failure.
pub struct PendingResources {
    tracker: ResourceTracker,
    changed: Option<ChangedCallback>,
    finished: bool,
}

impl PendingResources {
    pub fn complete(mut self) {
        self.finish(None);
    }

    /// Records `err`; the next device pass reports it and retries creation.
    pub fn fail(mut self, err: anyhow::Error) {
        self.finish(Some(err));
    }

    fn finish(&mut self, err: Option<anyhow::Error>) {
        if self.finished {
            return;
        }
        self.finished = true;

        {
            let mut state = self.tracker.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            if let Some(err) = err {
                state.failure.get_or_insert(err);
            }
        }

        // Notify with the lock released; the callback may read tracker state.
        if let Some(changed) = &self.changed {
            changed();
        }
    }
}

impl Drop for PendingResources {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("pending resources dropped without completing");
            self.finish(Some(anyhow::anyhow!(
                "pending resources were dropped without completing"
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (ChangedCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let cb: ChangedCallback = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (cb, count)
    }

    #[test]
    fn tracker_done_without_pending() {
        let tracker = ResourceTracker::default();
        assert!(matches!(tracker.take_status(), TrackerStatus::Done));
    }

    #[test]
    fn pending_until_completed() {
        let tracker = ResourceTracker::default();
        let (cb, count) = counting_callback();
        let args = CreateResourcesEventArgs::new(&(), CreateResourcesReason::FirstTime, &tracker, Some(&cb));

        let a = args.track_pending();
        let b = args.track_pending();
        assert!(matches!(tracker.take_status(), TrackerStatus::Outstanding));

        a.complete();
        assert!(matches!(tracker.take_status(), TrackerStatus::Outstanding));
        b.complete();
        assert!(matches!(tracker.take_status(), TrackerStatus::Done));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_is_reported_once() {
        let tracker = ResourceTracker::default();
        let args = CreateResourcesEventArgs::new(&(), CreateResourcesReason::NewDevice, &tracker, None);

        args.track_pending().fail(anyhow::anyhow!("texture decode failed"));
        match tracker.take_status() {
            TrackerStatus::Failed(err) => assert!(err.to_string().contains("decode")),
            _ => panic!("expected failure"),
        }
        assert!(matches!(tracker.take_status(), TrackerStatus::Done));
    }

    #[test]
    fn dropping_handle_counts_as_failure() {
        let tracker = ResourceTracker::default();
        let args = CreateResourcesEventArgs::new(&(), CreateResourcesReason::FirstTime, &tracker, None);
        drop(args.track_pending());
        assert!(matches!(tracker.take_status(), TrackerStatus::Failed(_)));
    }

    #[test]
    fn completes_from_another_thread() {
        let tracker = ResourceTracker::default();
        let args = CreateResourcesEventArgs::new(&(), CreateResourcesReason::FirstTime, &tracker, None);
        let pending = args.track_pending();
        std::thread::spawn(move || pending.complete()).join().unwrap();
        assert!(matches!(tracker.take_status(), TrackerStatus::Done));
    }
}
