use crate::conn::session_ref::{upgrade, WeakSessionRef};
use std::time::Duration;

// The background pinger. It holds only a weak handle: the session dies
// with its connection, and the pinger thread winds down on the next tick.
//
// A ping takes the inner lock like any other operation; while a caller
// holds the wire (including during a streaming LOB read) the ping is
// skipped, never queued behind.
pub(crate) fn spawn(weak_session: WeakSessionRef, interval: Duration) {
    std::thread::Builder::new()
        .name("scnp-keep-alive".to_string())
        .spawn(move || loop {
            std::thread::sleep(interval);
            let Some(session) = upgrade(&weak_session) else {
                trace!("keep-alive: session is gone");
                return;
            };
            if session.is_bad() {
                return;
            }
            match session.try_ping() {
                Ok(true) => trace!("keep-alive: ping succeeded"),
                Ok(false) => trace!("keep-alive: connection busy, ping skipped"),
                Err(e) => {
                    warn!("keep-alive: ping failed with {e:?}, stopping");
                    return;
                }
            }
        })
        .map_err(|e| warn!("could not spawn the keep-alive thread: {e}"))
        .ok();
}
