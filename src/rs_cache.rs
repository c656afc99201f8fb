//! The process-wide registry of open result-set ids.
//!
//! Used only by the legacy stored-procedure table-output mode: table
//! results are surfaced as reference values carrying the resultset id,
//! and the caller re-opens them through this registry. Entries belong to
//! the session that produced them and are purged when it closes.

use crate::base::ResultSet;
use crate::{ScnpError, ScnpResult};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

struct CacheEntry {
    session_id: i64,
    result_set: ResultSet,
}

static CACHE: OnceLock<Mutex<HashMap<u64, CacheEntry>>> = OnceLock::new();

fn cache() -> &'static Mutex<HashMap<u64, CacheEntry>> {
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(crate) fn register(resultset_id: u64, session_id: i64, result_set: ResultSet) {
    trace!("caching result set {resultset_id} of session {session_id}");
    cache().lock().expect("query result cache poisoned").insert(
        resultset_id,
        CacheEntry {
            session_id,
            result_set,
        },
    );
}

pub(crate) fn take(resultset_id: u64) -> ScnpResult<ResultSet> {
    cache()
        .lock()
        .expect("query result cache poisoned")
        .remove(&resultset_id)
        .map(|entry| entry.result_set)
        .ok_or_else(|| {
            ScnpError::InvalidArgument(format!(
                "no open result set with id {resultset_id} in the query result cache"
            ))
        })
}

// Called when an RsCore dies so that a cached cursor cannot outlive its
// server-side counterpart. A no-op for ids that were never registered.
// Entries are dropped outside the lock: dropping a cursor can re-enter
// this module.
pub(crate) fn unregister(resultset_id: u64) {
    let removed = match CACHE.get() {
        Some(cache) => match cache.lock() {
            Ok(mut map) => map.remove(&resultset_id),
            Err(_) => None,
        },
        None => None,
    };
    drop(removed);
}

pub(crate) fn purge_session(session_id: i64) {
    let mut removed = Vec::new();
    if let Some(cache) = CACHE.get() {
        if let Ok(mut map) = cache.lock() {
            let ids: Vec<u64> = map
                .iter()
                .filter(|(_, entry)| entry.session_id == session_id)
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                if let Some(entry) = map.remove(&id) {
                    removed.push(entry);
                }
            }
        }
    }
    drop(removed);
}

/// Number of cached result-set references (all sessions).
#[must_use]
pub fn len() -> usize {
    CACHE
        .get()
        .and_then(|cache| cache.lock().ok().map(|map| map.len()))
        .unwrap_or(0)
}

/// Drops every cached result-set reference. Intended for tests.
pub fn clear() {
    let mut removed = Vec::new();
    if let Some(cache) = CACHE.get() {
        if let Ok(mut map) = cache.lock() {
            let ids: Vec<u64> = map.keys().copied().collect();
            for id in ids {
                if let Some(entry) = map.remove(&id) {
                    removed.push(entry);
                }
            }
        }
    }
    drop(removed);
}
