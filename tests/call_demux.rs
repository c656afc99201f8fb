//! Demultiplexing of stored-procedure replies: scalar outs, table outs,
//! and the legacy table-output mode with the process-wide result cache.

mod test_utils;

use scnp::{connect, Value};
use std::io::Write;
use std::net::TcpStream;
use test_utils::*;

fn serve_prepare_call(stream: &mut TcpStream, statement_id: u64, parameter_metadata_bytes: Vec<u8>, parameter_count: i32) {
    let request = read_request(stream).unwrap();
    assert_eq!(request.message_type, MSG_TYPE_PREPARE);
    let mut id = Vec::new();
    id.extend_from_slice(&statement_id.to_le_bytes());
    stream
        .write_all(&build_reply(
            SESSION_ID,
            FC_DB_PROCEDURE_CALL,
            &[
                RawPart::new(PART_KIND_STATEMENT_ID, 1, id),
                RawPart::new(PART_KIND_PARAMETER_METADATA, parameter_count, parameter_metadata_bytes),
            ],
        ))
        .unwrap();
}

fn serve_drop_statement(stream: &mut TcpStream) {
    let request = read_request(stream).unwrap();
    assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
    stream
        .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
        .unwrap();
}

// NVARCHAR output value: length-prefixed CESU-8.
fn string_cell(s: &str) -> Vec<u8> {
    let mut w = Vec::new();
    w.push(s.len() as u8);
    w.extend_from_slice(s.as_bytes());
    w
}

#[test]
fn call_with_scalar_out() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        serve_prepare_call(stream, 21, parameter_metadata(11, 4, 1024, 0), 1); // OUT NVARCHAR

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_DB_PROCEDURE_CALL,
                &[RawPart::new(
                    PART_KIND_OUTPUT_PARAMETERS,
                    1,
                    string_cell("Hello World!"),
                )],
            ))
            .unwrap();

        serve_drop_statement(stream);
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let statement = connection.prepare("call P(?)").unwrap();
    let call_result = statement.call(vec![]).unwrap();

    let output_parameters = call_result.output_parameters.expect("scalar out expected");
    let values = output_parameters.into_values();
    assert_eq!(values.len(), 1);
    match &values[0] {
        Value::String(s) => assert_eq!(s, "Hello World!"),
        v => panic!("unexpected out value {v:?}"),
    }
    assert!(call_result.table_results.is_empty());

    drop(statement);
    drop(connection);
    server.join().unwrap();
}

fn table_out_parts(resultset_id: u64) -> Vec<RawPart> {
    let mut id = Vec::new();
    id.extend_from_slice(&resultset_id.to_le_bytes());
    let mut rows = Vec::new();
    for value in ["one", "two", "three"] {
        rows.extend_from_slice(&string_cell(value));
    }
    vec![
        RawPart::new(PART_KIND_RESULT_SET_METADATA, 1, column_metadata(11, false, 0, 256)),
        RawPart::new(PART_KIND_RESULT_SET_ID, 1, id),
        RawPart::new(PART_KIND_RESULT_SET, 3, rows)
            .with_attributes(ATTR_LAST_PACKET | ATTR_RESULT_SET_CLOSED),
    ]
}

#[test]
fn call_with_table_out() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        serve_prepare_call(stream, 22, Vec::new(), 0);

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_DB_PROCEDURE_CALL,
                &table_out_parts(733),
            ))
            .unwrap();

        serve_drop_statement(stream);
        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let statement = connection.prepare("call TABLE_OUT_PROC(?)").unwrap();
    let mut call_result = statement.call(vec![]).unwrap();

    assert!(call_result.output_parameters.is_none());
    assert_eq!(call_result.table_results.len(), 1);
    let result_set = call_result.table_results.remove(0);
    let rows: Vec<String> = result_set
        .into_rows()
        .unwrap()
        .into_iter()
        .map(|row| row.into_values().remove(0).try_into_string().unwrap())
        .collect();
    assert_eq!(rows, ["one", "two", "three"]);

    drop(statement);
    drop(connection);
    server.join().unwrap();
}

#[test]
fn legacy_mode_goes_through_the_query_result_cache() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");
        serve_prepare_call(stream, 23, Vec::new(), 0);

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_DB_PROCEDURE_CALL,
                &table_out_parts(915),
            ))
            .unwrap();

        serve_drop_statement(stream);
        drain(stream);
    });

    let mut config = test_config(port);
    config.legacy_table_output = true;
    let connection = connect(&config).unwrap();
    let statement = connection.prepare("call TABLE_OUT_PROC(?)").unwrap();
    let call_result = statement.call(vec![]).unwrap();

    assert!(call_result.table_results.is_empty());
    assert_eq!(call_result.table_refs, [915]);
    assert_eq!(scnp::rs_cache::len(), 1);

    // the reference can be re-opened exactly once
    let result_set = connection.resultset_for_ref(915).unwrap();
    assert_eq!(scnp::rs_cache::len(), 0);
    assert!(connection.resultset_for_ref(915).is_err());
    assert_eq!(result_set.into_rows().unwrap().len(), 3);

    drop(statement);
    drop(connection);
    server.join().unwrap();
}
