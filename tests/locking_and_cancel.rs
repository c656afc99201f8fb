//! The connection locking discipline and the cancellation path.

mod test_utils;

use scnp::{connect, ScnpError};
use std::io::Write;
use std::time::{Duration, Instant};
use test_utils::*;

#[test]
fn open_cursor_rejects_statements_and_fetches_to_the_end() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        // the query: one buffered row, cursor stays open on the server
        let _request = read_request(stream).unwrap();
        let mut resultset_id = Vec::new();
        resultset_id.extend_from_slice(&501_u64.to_le_bytes());
        let mut row = Vec::new();
        row.push(1);
        row.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_SELECT,
                &[
                    RawPart::new(PART_KIND_RESULT_SET_ID, 1, resultset_id),
                    RawPart::new(PART_KIND_RESULT_SET_METADATA, 1, column_metadata(3, false, 0, 10)),
                    RawPart::new(PART_KIND_RESULT_SET, 1, row),
                ],
            ))
            .unwrap();

        // the fetch: one more row, then the cursor is done
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_FETCH_NEXT);
        assert!(request.part_of_kind(PART_KIND_FETCH_SIZE).is_some());
        let mut row = Vec::new();
        row.push(1);
        row.extend_from_slice(&2_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_FETCH,
                &[RawPart::new(PART_KIND_RESULT_SET, 1, row)
                    .with_attributes(ATTR_LAST_PACKET | ATTR_RESULT_SET_CLOSED)],
            ))
            .unwrap();

        // after the cursor is gone, ordinary statements work again
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE_DIRECT);
        stream
            .write_all(&build_reply(SESSION_ID, FC_DDL, &[]))
            .unwrap();

        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let mut result_set = connection.query_direct("select id from T").unwrap();

    // the open cursor blocks statement-shaped operations
    for result in [
        connection.execute_direct("create table X (a int)").map(|_| ()),
        connection.prepare("select 1 from dummy").map(|_| ()),
        connection.ping(),
    ] {
        assert!(
            matches!(result, Err(ScnpError::NestedQuery)),
            "expected NestedQuery, got {result:?}"
        );
    }

    let row1 = result_set.next_row().unwrap().unwrap();
    assert_eq!(row1.into_values()[0].to_string(), "1");
    let row2 = result_set.next_row().unwrap().unwrap();
    assert_eq!(row2.into_values()[0].to_string(), "2");
    assert!(result_set.next_row().unwrap().is_none());
    drop(result_set);

    connection.execute_direct("create table X (a int)").unwrap();
    drop(connection);
    server.join().unwrap();
}

#[test]
fn cancellation_interrupts_and_retires_the_connection() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        // swallow the query and never answer; the client gets interrupted
        let _request = read_request(stream).unwrap();
        std::thread::sleep(Duration::from_millis(1500));
    });

    let connection = connect(&test_config(port)).unwrap();
    let canceller = connection.canceller();
    let cancel_thread = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });

    let started = Instant::now();
    let error = connection
        .query_direct("select expensive from huge_table")
        .unwrap_err();
    assert!(
        matches!(error, ScnpError::Cancelled),
        "expected Cancelled, got {error:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(1));

    // every subsequent operation finds the connection retired
    let error = connection.ping().unwrap_err();
    assert!(matches!(error, ScnpError::BadConnection { .. }));
    let error = connection.execute_direct("select 1 from dummy").unwrap_err();
    assert!(matches!(error, ScnpError::BadConnection { .. }));

    cancel_thread.join().unwrap();
    drop(connection);
    server.join().unwrap();
}

#[test]
fn cancellation_before_any_traffic_aborts_locally() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    connection.canceller().cancel();
    let error = connection.ping().unwrap_err();
    assert!(matches!(error, ScnpError::Cancelled));
    drop(connection);
    server.join().unwrap();
}
