//! Connect, DDL/DML execution, prepared statements, query and fetch.

mod test_utils;

use scnp::{connect, ExecutionResult, ScnpError, Value};
use std::io::Write;
use test_utils::*;

#[test]
fn scram_connect_execute_prepare_query() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        // create table
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE_DIRECT);
        assert!(request.auto_commit);
        let command = request.part_of_kind(PART_KIND_COMMAND).unwrap();
        assert_eq!(
            command.body,
            b"create column table T (id integer, field double)".to_vec()
        );
        stream
            .write_all(&build_reply(SESSION_ID, FC_DDL, &[]))
            .unwrap();

        // prepare the insert
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_PREPARE);
        let mut statement_id = Vec::new();
        statement_id.write_all(&4242_u64.to_le_bytes()).unwrap();
        let mut parameter_metadata = parameter_metadata(3, 1, 10, 0); // IN INT
        parameter_metadata.extend_from_slice(&parameter_metadata_double());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_STATEMENT_ID, 1, statement_id),
                    RawPart::new(PART_KIND_PARAMETER_METADATA, 2, parameter_metadata),
                ],
            ))
            .unwrap();

        // execute with two rows
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        let parameters = request.part_of_kind(PART_KIND_PARAMETERS).unwrap();
        assert_eq!(parameters.argument_count, 2);
        // row: [tag 3, i32][tag 7, f64] twice
        assert_eq!(parameters.body.len(), 2 * (5 + 9));
        assert_eq!(parameters.body[0], 3); // INT tag
        assert_eq!(parameters.body[5], 7); // DOUBLE tag
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[RawPart::new(PART_KIND_EXECUTION_RESULTS, 2, execution_results)],
            ))
            .unwrap();

        // select count(*)
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE_DIRECT);
        let mut resultset_id = Vec::new();
        resultset_id.extend_from_slice(&77_u64.to_le_bytes());
        let mut row = Vec::new();
        row.push(1); // not null
        row.extend_from_slice(&2_i64.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_SELECT,
                &[
                    RawPart::new(PART_KIND_RESULT_SET_ID, 1, resultset_id),
                    RawPart::new(
                        PART_KIND_RESULT_SET_METADATA,
                        1,
                        column_metadata(4, false, 0, 19), // BIGINT
                    ),
                    RawPart::new(PART_KIND_RESULT_SET, 1, row)
                        .with_attributes(ATTR_LAST_PACKET | ATTR_RESULT_SET_CLOSED),
                ],
            ))
            .unwrap();

        // drop of the prepared statement
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();

        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    assert_eq!(connection.session_id(), SESSION_ID);
    let version = connection.server_version().unwrap().unwrap();
    assert_eq!(version.sps(), 48);

    connection
        .execute_direct("create column table T (id integer, field double)")
        .unwrap();

    let statement = connection.prepare("insert into T values (?, ?)").unwrap();
    assert_eq!(statement.parameter_descriptors().len(), 2);
    let results = statement
        .execute_batch(vec![
            vec![Value::Int(0), Value::Double(0.0)],
            vec![Value::Int(1), Value::Double(1.0)],
        ])
        .unwrap();
    assert_eq!(ExecutionResult::count(&results), 2);

    let count = connection
        .query_single_value("select count(*) from T")
        .unwrap();
    assert_eq!(count.try_into_i64().unwrap(), 2);

    drop(statement);
    drop(connection);
    server.join().unwrap();
}

fn parameter_metadata_double() -> Vec<u8> {
    test_utils::parameter_metadata(7, 1, 15, 0)
}

#[test]
fn supplier_rows_go_out_in_one_package() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        let _prepare = read_request(stream).unwrap();
        let mut statement_id = Vec::new();
        statement_id.extend_from_slice(&55_u64.to_le_bytes());
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

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        let parameters = request.part_of_kind(PART_KIND_PARAMETERS).unwrap();
        assert_eq!(parameters.argument_count, 1000);
        let mut execution_results = Vec::new();
        for _ in 0..1000 {
            execution_results.extend_from_slice(&1_i32.to_le_bytes());
        }
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[RawPart::new(PART_KIND_EXECUTION_RESULTS, 1000, execution_results)],
            ))
            .unwrap();

        let _drop = read_request(stream).unwrap();
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let statement = connection.prepare("insert into T values (?)").unwrap();
    let mut next = 0_i32;
    let results = statement
        .execute_from_supplier(|| {
            if next < 1000 {
                next += 1;
                Some(vec![Value::Int(next)])
            } else {
                None
            }
        })
        .unwrap();
    assert_eq!(ExecutionResult::count(&results), 1000);
    drop(statement);
    drop(connection);
    server.join().unwrap();
}

#[test]
fn server_error_bubbles_up_with_its_code() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        let _request = read_request(stream).unwrap();
        // error record: code 259, position 1, text, level error, padded
        let text = b"invalid table name";
        let mut body = Vec::new();
        body.extend_from_slice(&259_i32.to_le_bytes());
        body.extend_from_slice(&1_i32.to_le_bytes());
        body.extend_from_slice(&(text.len() as i32).to_le_bytes());
        body.push(1); // severity: error
        body.extend_from_slice(b"42S02");
        body.extend_from_slice(text);
        let pad = 8 - (18 + text.len()) % 8;
        body.extend_from_slice(&vec![0_u8; pad]);
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_NIL,
                &[RawPart::new(PART_KIND_ERROR, 1, body)],
            ))
            .unwrap();
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let error = connection
        .execute_direct("select broken from NO_SUCH_TABLE")
        .unwrap_err();
    match &error {
        ScnpError::Server { source } => {
            assert_eq!(source.code(), 259);
            assert_eq!(source.sqlstate(), b"42S02");
            assert!(source.text().contains("invalid table name"));
        }
        e => panic!("unexpected error {e:?}"),
    }
    drop(connection);
    server.join().unwrap();
}

#[test]
fn failed_rows_are_linked_to_their_errors_by_position() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        let _prepare = read_request(stream).unwrap();
        let mut statement_id = Vec::new();
        statement_id.extend_from_slice(&7_u64.to_le_bytes());
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

        let _execute = read_request(stream).unwrap();
        // three rows: ok, failed, ok; one error record for the failure
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        execution_results.extend_from_slice(&(-3_i32).to_le_bytes());
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        let text = b"unique constraint violated";
        let mut error_body = Vec::new();
        error_body.extend_from_slice(&301_i32.to_le_bytes());
        error_body.extend_from_slice(&0_i32.to_le_bytes());
        error_body.extend_from_slice(&(text.len() as i32).to_le_bytes());
        error_body.push(1);
        error_body.extend_from_slice(b"23000");
        error_body.extend_from_slice(text);
        let pad = 8 - (18 + text.len()) % 8;
        error_body.extend_from_slice(&vec![0_u8; pad]);
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_EXECUTION_RESULTS, 3, execution_results),
                    RawPart::new(PART_KIND_ERROR, 1, error_body),
                ],
            ))
            .unwrap();

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let statement = connection.prepare("insert into U values (?)").unwrap();
    let error = statement
        .execute_batch(vec![
            vec![Value::Int(1)],
            vec![Value::Int(1)],
            vec![Value::Int(2)],
        ])
        .unwrap_err();
    match &error {
        ScnpError::Execution(execution_results) => {
            let results = &execution_results.0;
            assert_eq!(results.len(), 3);
            assert!(!results[0].is_failure());
            match &results[1] {
                ExecutionResult::Failure(Some(server_error)) => {
                    assert_eq!(server_error.code(), 301);
                }
                other => panic!("row 1 should carry the linked error, got {other:?}"),
            }
            assert!(!results[2].is_failure());
        }
        e => panic!("unexpected error {e:?}"),
    }
    drop(statement);
    drop(connection);
    server.join().unwrap();
}
