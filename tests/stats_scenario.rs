//! Counter bookkeeping across a full scenario: everything that is opened
//! is accounted for and returns to its baseline. Kept in its own test
//! binary because the counters are process-wide.

mod test_utils;

use scnp::{connect, Connection, Metric, Value};
use std::io::Write;
use test_utils::*;

#[test]
fn gauges_return_to_their_baseline() {
    flexi_logger::Logger::try_with_env_or_str("info")
        .unwrap()
        .start()
        .ok();
    let statistics = Connection::statistics();
    let base_connections = statistics.open_connections();
    let base_statements = statistics.open_statements();
    let base_cursors = statistics.open_cursors();
    let base_auth_count = statistics.histogram(Metric::Auth).count();
    let base_bytes_written = statistics.bytes_written();

    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        // prepare
        let _request = read_request(stream).unwrap();
        let mut statement_id = Vec::new();
        statement_id.extend_from_slice(&31_u64.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_STATEMENT_ID, 1, statement_id),
                    RawPart::new(PART_KIND_PARAMETER_METADATA, 1, parameter_metadata(3, 1, 10, 0)),
                ],
            ))
            .unwrap();

        // execute
        let _request = read_request(stream).unwrap();
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[RawPart::new(PART_KIND_EXECUTION_RESULTS, 1, execution_results)],
            ))
            .unwrap();

        // query with an open cursor, closed by the client
        let _request = read_request(stream).unwrap();
        let mut resultset_id = Vec::new();
        resultset_id.extend_from_slice(&441_u64.to_le_bytes());
        let mut row = Vec::new();
        row.push(1);
        row.extend_from_slice(&7_i32.to_le_bytes());
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

        // the client closes the cursor
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_CLOSE_RESULT_SET);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();

        // drop of the statement
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();

        drain(stream);
    });

    {
        let connection = connect(&test_config(port)).unwrap();
        assert_eq!(statistics.open_connections(), base_connections + 1);
        assert_eq!(
            statistics.histogram(Metric::Auth).count(),
            base_auth_count + 1
        );

        let statement = connection.prepare("insert into T values (?)").unwrap();
        assert_eq!(statistics.open_statements(), base_statements + 1);
        statement.execute(vec![Value::Int(1)]).unwrap();

        let result_set = connection.query_direct("select id from T").unwrap();
        assert_eq!(statistics.open_cursors(), base_cursors + 1);
        drop(result_set); // sends close-resultset, cursor still open on the server

        assert_eq!(statistics.open_cursors(), base_cursors);
        drop(statement);
        assert_eq!(statistics.open_statements(), base_statements);
        drop(connection);
    }

    assert_eq!(statistics.open_connections(), base_connections);
    assert!(statistics.bytes_written() > base_bytes_written);
    assert!(statistics.histogram(Metric::Execute).count() > 0);
    assert!(statistics.histogram(Metric::Read).sum_micros() > 0);
    server.join().unwrap();
}
