//! Pipeline progress reporting.
//!
//! Progress flows through a watch channel as whole percentages. Values are
//! clamped to 100 and never decrease; the final value on success is exactly
//! 100. A pipeline run without an observer uses [`Progress::none`] and
//! reports nowhere.

use tokio::sync::watch;

/// Progress reporter handed to a pipeline run.
#[derive(Clone)]
pub struct Progress {
    tx: Option<watch::Sender<u8>>,
}

impl Progress {
    /// Create a reporter and the receiver observing it, starting at 0.
    pub fn channel() -> (Progress, watch::Receiver<u8>) {
        let (tx, rx) = watch::channel(0);
        (Progress { tx: Some(tx) }, rx)
    }

    /// A reporter that discards all updates.
    pub fn none() -> Progress {
        Progress { tx: None }
    }

    /// Report a percentage. Clamped to 100; regressions are ignored.
    pub fn report(&self, pct: u8) {
        if let Some(tx) = &self.tx {
            let pct = pct.min(100);
            tx.send_if_modified(|current| {
                if pct > *current {
                    *current = pct;
                    true
                } else {
                    false
                }
            });
        }
    }
}
