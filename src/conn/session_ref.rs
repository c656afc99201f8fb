use crate::base::RsState;
use crate::conn::{ConnectConfiguration, SessionCore};
use crate::protocol::parts::{ParameterDescriptors, ResultSetMetadata};
use crate::protocol::util::Cesu8Handling;
use crate::protocol::{MessageType, Part, Reply, ReplyType, Request, COMMAND_OPTIONS_NONE};
use crate::stats::Statistics;
use crate::{ScnpError, ScnpResult};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

// The shared handle to a session.
//
// Locking happens in two layers: the outer layer is the open-cursor
// gate (a statement-shaped operation is rejected with NestedQuery while
// a cursor is open), the inner layer is the mutex over the wire stream,
// held for exactly one request/reply exchange at a time. Cursor traffic
// (fetch-next, LOB chunk reads) bypasses the outer gate because it
// belongs to the open cursor itself.
#[derive(Clone, Debug)]
pub(crate) struct SessionRef(Arc<SessionRefInner>);

#[derive(Debug)]
pub(crate) struct SessionRefInner {
    core: Mutex<SessionCore>,
    bad: AtomicBool,
    closed: AtomicBool,
    cancelled: AtomicBool,
    open_cursors: AtomicUsize,
    cesu8_handling: Cesu8Handling,
    fetch_size: AtomicU32,
    lob_read_length: AtomicU32,
    lob_write_length: AtomicUsize,
    legacy_table_output: bool,
    session_id: i64,
    socket: Mutex<Option<std::net::TcpStream>>,
}

impl SessionRef {
    pub fn new(core: SessionCore, config: &ConnectConfiguration) -> ScnpResult<Self> {
        let socket = core.shutdown_handle().ok();
        let session_id = core.session_id();
        Ok(Self(Arc::new(SessionRefInner {
            core: Mutex::new(core),
            bad: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            open_cursors: AtomicUsize::new(0),
            cesu8_handling: config.cesu8_handling,
            fetch_size: AtomicU32::new(config.fetch_size.max(1)),
            lob_read_length: AtomicU32::new(config.lob_read_length.max(1)),
            lob_write_length: AtomicUsize::new(config.lob_write_length.max(1)),
            legacy_table_output: config.legacy_table_output,
            session_id,
            socket: Mutex::new(socket),
        })))
    }

    pub fn session_id(&self) -> i64 {
        self.0.session_id
    }

    pub fn cesu8_handling(&self) -> Cesu8Handling {
        self.0.cesu8_handling
    }

    pub fn fetch_size(&self) -> u32 {
        self.0.fetch_size.load(Ordering::Relaxed)
    }

    pub fn set_fetch_size(&self, fetch_size: u32) {
        self.0.fetch_size.store(fetch_size.max(1), Ordering::Relaxed);
    }

    pub fn lob_read_length(&self) -> u32 {
        self.0.lob_read_length.load(Ordering::Relaxed)
    }

    pub fn lob_write_length(&self) -> usize {
        self.0.lob_write_length.load(Ordering::Relaxed)
    }

    pub fn legacy_table_output(&self) -> bool {
        self.0.legacy_table_output
    }

    // --- lock layers ----------------------------------------------------

    // The outer gate: statement-shaped operations must not interleave
    // with an open query.
    pub fn check_no_open_cursor(&self) -> ScnpResult<()> {
        if self.0.open_cursors.load(Ordering::Acquire) > 0 {
            Err(ScnpError::NestedQuery)
        } else {
            Ok(())
        }
    }

    pub fn register_open_cursor(&self) {
        self.0.open_cursors.fetch_add(1, Ordering::AcqRel);
        Statistics::global().change_open_cursors(1);
    }

    pub fn unregister_open_cursor(&self) {
        self.0.open_cursors.fetch_sub(1, Ordering::AcqRel);
        Statistics::global().change_open_cursors(-1);
    }

    pub fn has_open_cursor(&self) -> bool {
        self.0.open_cursors.load(Ordering::Acquire) > 0
    }

    // --- state flags ----------------------------------------------------

    pub fn mark_bad(&self) {
        if !self.0.bad.swap(true, Ordering::AcqRel) {
            debug!("session {} is retired", self.0.session_id);
        }
    }

    pub fn is_bad(&self) -> bool {
        self.0.bad.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    fn check_usable(&self) -> ScnpResult<()> {
        if self.is_cancelled() {
            self.mark_bad();
            return Err(ScnpError::Cancelled);
        }
        if self.is_bad() {
            return Err(ScnpError::BadConnection { source: None });
        }
        Ok(())
    }

    // --- wire traffic ---------------------------------------------------

    // Takes the inner lock for one request/reply exchange. I/O and
    // protocol failures retire the connection permanently; a failure
    // caused by cancellation surfaces as Cancelled.
    pub fn roundtrip(
        &self,
        request: &mut Request,
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        o_rs: &mut Option<&mut RsState>,
    ) -> ScnpResult<Reply> {
        self.check_usable()?;
        let result = {
            let mut core = self.0.core.lock()?;
            core.augment_request(request);
            core.roundtrip(request, Some(self), o_a_rsmd, o_a_descriptors, o_rs)
        };
        match result {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if self.is_cancelled() {
                    self.mark_bad();
                    return Err(ScnpError::Cancelled);
                }
                Err(self.fatalize(e))
            }
        }
    }

    pub fn send(&self, mut request: Request) -> ScnpResult<Reply> {
        self.roundtrip(&mut request, None, None, &mut None)
    }

    // Best-effort send for cleanup paths (closing cursors, dropping
    // statements). Such cleanup can run while this thread already holds
    // the wire lock (e.g. when reply decoding unwinds); in that case the
    // request is skipped rather than deadlocking on the own lock.
    pub fn try_send(&self, mut request: Request) -> ScnpResult<bool> {
        if self.is_bad() || self.is_cancelled() {
            return Ok(false);
        }
        let result = match self.0.core.try_lock() {
            Err(std::sync::TryLockError::WouldBlock) => return Ok(false),
            Err(std::sync::TryLockError::Poisoned(_)) => return Err(ScnpError::Poison),
            Ok(mut core) => {
                core.augment_request(&mut request);
                core.roundtrip(&request, Some(self), None, None, &mut None)
            }
        };
        match result {
            Ok(_) => Ok(true),
            Err(e) => Err(self.fatalize(e)),
        }
    }

    // I/O errors and protocol inconsistencies mean the stream can no
    // longer be trusted.
    fn fatalize(&self, e: ScnpError) -> ScnpError {
        match e {
            e @ (ScnpError::Io { .. }
            | ScnpError::Protocol(_)
            | ScnpError::Cesu8
            | ScnpError::Poison) => {
                self.mark_bad();
                ScnpError::bad_connection(e)
            }
            e @ ScnpError::BadConnection { .. } => {
                self.mark_bad();
                e
            }
            e => e,
        }
    }

    // A trivial statement that proves the connection is alive.
    pub fn ping(&self) -> ScnpResult<()> {
        let mut request = Request::new(MessageType::ExecuteDirect, COMMAND_OPTIONS_NONE);
        request.push(Part::Command("SELECT 1 FROM DUMMY"));
        let reply = self.roundtrip(&mut request, None, None, &mut None)?;
        reply.assert_expected_reply_type(ReplyType::Select).ok();
        Ok(())
    }

    // --- cancellation ---------------------------------------------------

    pub fn canceller(&self) -> Canceller {
        Canceller {
            inner: Arc::downgrade(&self.0),
        }
    }

    // --- teardown -------------------------------------------------------

    // Closing is idempotent. The session's entries in the query result
    // cache die with it.
    pub fn close(&self) {
        if !self.0.closed.swap(true, Ordering::AcqRel) {
            crate::rs_cache::purge_session(self.0.session_id);
            if !self.is_bad() {
                if let Ok(mut core) = self.0.core.lock() {
                    core.emit_disconnect();
                }
            }
            self.mark_bad();
            debug!("session {} is closed", self.0.session_id);
        }
    }

    pub fn with_core<R>(&self, f: impl FnOnce(&mut SessionCore) -> R) -> ScnpResult<R> {
        let mut core = self.0.core.lock()?;
        Ok(f(&mut core))
    }

    // Used by the keep-alive pinger, which must never block a caller:
    // the ping is skipped when the wire is busy or a cursor is open.
    pub fn try_ping(&self) -> ScnpResult<bool> {
        if self.has_open_cursor() {
            return Ok(false);
        }
        if self.is_bad() || self.is_cancelled() {
            return Err(ScnpError::BadConnection { source: None });
        }
        let result = {
            match self.0.core.try_lock() {
                Err(std::sync::TryLockError::WouldBlock) => return Ok(false),
                Err(std::sync::TryLockError::Poisoned(_)) => {
                    return Err(ScnpError::Poison);
                }
                Ok(mut core) => {
                    let mut request =
                        Request::new(MessageType::ExecuteDirect, COMMAND_OPTIONS_NONE);
                    request.push(Part::Command("SELECT 1 FROM DUMMY"));
                    core.roundtrip(&request, Some(self), None, None, &mut None)
                }
            }
        };
        match result {
            Ok(_) => Ok(true),
            Err(e) => Err(self.fatalize(e)),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionRefInner> {
        Arc::downgrade(&self.0)
    }
}

/// Interrupts the operation that is currently running on a connection.
///
/// Cancellation closes the socket: the in-flight I/O returns immediately,
/// the operation ends with [`ScnpError::Cancelled`], and the connection is
/// permanently retired. A cancellation before any wire traffic aborts the
/// next operation locally; one after the reply was fully received has no
/// effect on the completed operation.
#[derive(Clone, Debug)]
pub struct Canceller {
    inner: Weak<SessionRefInner>,
}

impl Canceller {
    /// Cancels the connection's in-flight operation.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancelled.store(true, Ordering::Release);
            if let Ok(socket_guard) = inner.socket.lock() {
                if let Some(ref socket) = *socket_guard {
                    debug!("cancelling: shutting the socket down");
                    socket.shutdown(std::net::Shutdown::Both).ok();
                }
            }
            inner.bad.store(true, Ordering::Release);
        }
    }
}

pub(crate) type WeakSessionRef = Weak<SessionRefInner>;

pub(crate) fn upgrade(weak: &WeakSessionRef) -> Option<SessionRef> {
    weak.upgrade().map(SessionRef)
}
