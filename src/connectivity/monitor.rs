//! Network reachability state with edge-triggered "became online" callbacks.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

const ENABLE_LOGS: bool = true;

use crate::log_info;

type OnlineListener = Box<dyn Fn() + Send + Sync + 'static>;

struct MonitorInner {
    state_tx: watch::Sender<bool>,
    listeners: Mutex<Vec<OnlineListener>>,
}

#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state_tx, _) = watch::channel(initially_online);
        Self {
            inner: Arc::new(MonitorInner {
                state_tx,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn current_state(&self) -> bool {
        *self.inner.state_tx.borrow()
    }

    /// Register `callback` to run once per offline → online transition.
    pub fn on_became_online<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = match self.inner.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(Box::new(callback));
    }

    /// Reachability updates for status displays.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.state_tx.subscribe()
    }

    /// Feed a reachability report from the platform. Repeated reports of the
    /// same state are ignored; listeners fire only when this report flips the
    /// state from offline to online. Returns whether they fired.
    pub fn report(&self, reachable: bool) -> bool {
        let previous = self.inner.state_tx.send_replace(reachable);
        if previous == reachable {
            return false;
        }

        if !reachable {
            log_info!("network became unreachable");
            return false;
        }

        log_info!("network became reachable");
        let listeners = match self.inner.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(monitor: &ConnectivityMonitor) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        monitor.on_became_online(move || {
            handle.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn fires_only_on_offline_to_online_edges() {
        let monitor = ConnectivityMonitor::new(false);
        let count = counting(&monitor);

        assert!(monitor.report(true));
        assert!(!monitor.report(true));
        assert!(!monitor.report(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!monitor.report(false));
        assert!(!monitor.report(false));
        assert!(monitor.report(true));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn starting_online_needs_a_drop_before_firing() {
        let monitor = ConnectivityMonitor::new(true);
        let count = counting(&monitor);

        monitor.report(true);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(monitor.current_state());

        monitor.report(false);
        assert!(!monitor.current_state());
        monitor.report(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribers_see_the_latest_state() {
        let monitor = ConnectivityMonitor::new(false);
        let rx = monitor.subscribe();
        monitor.report(true);
        assert!(*rx.borrow());
    }
}
