use crate::conn::SessionRef;
use crate::protocol::{MessageType, Part, Request, COMMAND_OPTIONS_NONE};
use std::sync::{Arc, Mutex};

// Identity of a server-side cursor. Shared between the cursor state and
// the LOB handles of its rows: the server invalidates the row's locators
// when the result set is closed, so the handles keep it alive.
#[derive(Debug)]
pub(crate) struct RsCore {
    session: SessionRef,
    resultset_id: u64,
    server_side_closed: bool,
}

// Shared handle to an RsCore.
pub(crate) type RsRef = Arc<Mutex<RsCore>>;

impl RsCore {
    pub fn new_ref(session: SessionRef, resultset_id: u64) -> RsRef {
        session.register_open_cursor();
        Arc::new(Mutex::new(Self {
            session,
            resultset_id,
            server_side_closed: false,
        }))
    }

    pub fn resultset_id(&self) -> u64 {
        self.resultset_id
    }

    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    // The server closes a cursor implicitly with the last fetch.
    pub fn note_server_side_closed(&mut self) {
        self.server_side_closed = true;
    }
}

impl Drop for RsCore {
    // Close the server-side cursor if the server has not already done so.
    // Closing is best-effort; a failure only retires the connection.
    fn drop(&mut self) {
        self.session.unregister_open_cursor();
        crate::rs_cache::unregister(self.resultset_id);
        if !self.server_side_closed && !self.session.is_bad() {
            debug!("RsCore::drop(): closing result set {}", self.resultset_id);
            let mut request = Request::new(MessageType::CloseResultSet, COMMAND_OPTIONS_NONE);
            request.push(Part::ResultSetId(self.resultset_id));
            match self.session.try_send(request) {
                Ok(true) => {}
                Ok(false) => trace!("close of result set {} skipped", self.resultset_id),
                Err(e) => {
                    warn!("closing result set {} failed with {e:?}", self.resultset_id);
                }
            }
        }
    }
}
