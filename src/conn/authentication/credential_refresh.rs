//! Single-flight refresh of expired credentials.
//!
//! When several connection attempts fail with an authentication error at
//! the same time, only the first one may invoke the caller's refresh
//! callback; the others wait and reuse its result.

use std::sync::{Mutex, OnceLock};

pub(crate) struct RefreshGate<T: Clone> {
    inner: Mutex<GateState<T>>,
}

struct GateState<T> {
    epoch: u64,
    last: Option<T>,
}

impl<T: Clone> RefreshGate<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(GateState {
                epoch: 0,
                last: None,
            }),
        }
    }

    // The epoch to remember before starting a connection attempt.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().expect("refresh gate poisoned").epoch
    }

    // Refreshes at most once per epoch: the caller that still sees
    // `seen_epoch` runs the callback, every other caller gets the stored
    // result of the refresh that happened in between.
    pub fn refresh(
        &self,
        seen_epoch: u64,
        callback: &(dyn Fn() -> Option<T> + Send + Sync),
    ) -> Option<T> {
        let mut state = self.inner.lock().expect("refresh gate poisoned");
        if state.epoch == seen_epoch {
            debug!("running a credential refresh");
            state.last = callback();
            state.epoch += 1;
        } else {
            debug!("reusing the credential refreshed by a concurrent attempt");
        }
        state.last.clone()
    }
}

pub(crate) fn password_gate() -> &'static RefreshGate<String> {
    static GATE: OnceLock<RefreshGate<String>> = OnceLock::new();
    GATE.get_or_init(RefreshGate::new)
}

pub(crate) fn token_gate() -> &'static RefreshGate<String> {
    static GATE: OnceLock<RefreshGate<String>> = OnceLock::new();
    GATE.get_or_init(RefreshGate::new)
}

pub(crate) fn certificate_gate() -> &'static RefreshGate<crate::conn::ClientCertificate> {
    static GATE: OnceLock<RefreshGate<crate::conn::ClientCertificate>> = OnceLock::new();
    GATE.get_or_init(RefreshGate::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn only_one_caller_refreshes_per_epoch() {
        let gate = RefreshGate::<String>::new();
        let invocations = AtomicUsize::new(0);
        let callback = || {
            invocations.fetch_add(1, Ordering::SeqCst);
            Some("fresh".to_string())
        };

        let seen = gate.epoch();
        // two attempts that both saw the same epoch fail "concurrently"
        assert_eq!(gate.refresh(seen, &callback).as_deref(), Some("fresh"));
        assert_eq!(gate.refresh(seen, &callback).as_deref(), Some("fresh"));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        // a later failure with the new epoch refreshes again
        let seen = gate.epoch();
        assert_eq!(gate.refresh(seen, &callback).as_deref(), Some("fresh"));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }
}
