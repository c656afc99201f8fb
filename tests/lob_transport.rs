//! Chunked LOB read-back, piecewise LOB write, and the bulk packaging
//! rule.

mod test_utils;

use scnp::{connect, ExecutionResult, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use test_utils::*;

const TEXT: &str = "Hello World - 𝄞𝄞€€!";

// Server characters (UTF-16 units) of TEXT: the two clefs count twice.
fn server_char_count(s: &str) -> u64 {
    s.chars().map(|c| if c.len_utf8() == 4 { 2 } else { 1 }).sum()
}

#[test]
fn nclob_read_back_uses_char_offsets_in_the_cesu8_convention() {
    let cesu8_text = cesu8::to_cesu8(TEXT).to_vec();
    // split between the surrogate halves of the first clef: the server
    // counts the high half as a character of its own
    let split = 17;
    let first_chunk = cesu8_text[..split].to_vec();
    let rest = cesu8_text[split..].to_vec();
    // 14 ASCII units plus the high surrogate half
    let expected_offset = {
        let mut units = 0_u64;
        for b in &first_chunk {
            if (*b & 0b_1100_0000) != 0b_1000_0000 {
                units += 1;
            }
        }
        units
    };

    let (port, server) = spawn_server(move |stream| {
        serve_authentication(stream, "TESTER", "geheim");

        let _query = read_request(stream).unwrap();
        let mut resultset_id = Vec::new();
        resultset_id.extend_from_slice(&600_u64.to_le_bytes());
        let row = lob_cell(
            26, // NCLOB
            false,
            server_char_count(TEXT),
            cesu8_text.len() as u64,
            9009,
            &first_chunk,
        );
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_SELECT,
                &[
                    RawPart::new(PART_KIND_RESULT_SET_ID, 1, resultset_id),
                    RawPart::new(PART_KIND_RESULT_SET_METADATA, 1, column_metadata(26, true, 0, -1)),
                    RawPart::new(PART_KIND_RESULT_SET, 1, row).with_attributes(ATTR_LAST_PACKET),
                ],
            ))
            .unwrap();

        // the read-lob request must continue at the server-char offset
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_READ_LOB);
        let body = &request.part_of_kind(PART_KIND_READ_LOB_REQUEST).unwrap().body;
        let locator_id = u64::from_le_bytes(body[0..8].try_into().unwrap());
        let offset = u64::from_le_bytes(body[8..16].try_into().unwrap());
        assert_eq!(locator_id, 9009);
        assert_eq!(offset, expected_offset + 1, "1-based CESU-8 unit offset");
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_READ_LOB,
                &[RawPart::new(
                    PART_KIND_READ_LOB_REPLY,
                    1,
                    read_lob_reply_body(9009, true, &rest),
                )],
            ))
            .unwrap();

        drain(stream);
    });

    let connection = connect(&test_config(port)).unwrap();
    let mut result_set = connection.query_direct("select c from T").unwrap();
    let row = result_set.next_row().unwrap().unwrap();
    let value = row.into_values().remove(0);
    match value {
        Value::NClob(nclob) => {
            assert_eq!(nclob.total_char_length(), server_char_count(TEXT));
            assert_eq!(nclob.into_string().unwrap(), TEXT);
        }
        v => panic!("expected an NCLOB, got {v:?}"),
    }
    drop(result_set);
    drop(connection);
    server.join().unwrap();
}

#[test]
fn input_lob_streams_first_chunk_inline_and_the_rest_via_write_lob() {
    let expected_cesu8 = cesu8::to_cesu8(TEXT).to_vec();

    let (port, server) = spawn_server(move |stream| {
        serve_authentication(stream, "TESTER", "geheim");

        let _prepare = read_request(stream).unwrap();
        let mut statement_id = Vec::new();
        statement_id.extend_from_slice(&11_u64.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_STATEMENT_ID, 1, statement_id),
                    RawPart::new(PART_KIND_PARAMETER_METADATA, 1, parameter_metadata(26, 1, -1, 0)),
                ],
            ))
            .unwrap();

        // execute: the parameters part carries the LOB cell + first chunk
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        let parameters = request.part_of_kind(PART_KIND_PARAMETERS).unwrap();
        assert_eq!(parameters.argument_count, 1);
        // cell: type tag, options, chunk length, position
        assert_eq!(parameters.body[0], 26);
        let options = parameters.body[1];
        assert_eq!(options & 0b_10, 0b_10, "data included");
        assert_eq!(options & 0b_100, 0, "not last");
        let chunk_len =
            i32::from_le_bytes(parameters.body[2..6].try_into().unwrap()) as usize;
        let mut received = parameters.body[10..10 + chunk_len].to_vec();

        let mut locator = Vec::new();
        locator.extend_from_slice(&31337_u64.to_le_bytes());
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_EXECUTION_RESULTS, 1, execution_results),
                    RawPart::new(PART_KIND_WRITE_LOB_REPLY, 1, locator),
                ],
            ))
            .unwrap();

        // write-lob requests until the last-data flag arrives
        loop {
            let request = read_request(stream).unwrap();
            assert_eq!(request.message_type, MSG_TYPE_WRITE_LOB);
            let body = &request.part_of_kind(PART_KIND_WRITE_LOB_REQUEST).unwrap().body;
            let locator_id = u64::from_le_bytes(body[0..8].try_into().unwrap());
            assert_eq!(locator_id, 31337);
            let options = body[8];
            let offset = i64::from_le_bytes(body[9..17].try_into().unwrap());
            assert_eq!(offset, -1, "append mode");
            let len = u32::from_le_bytes(body[17..21].try_into().unwrap()) as usize;
            received.extend_from_slice(&body[21..21 + len]);
            stream
                .write_all(&build_reply(SESSION_ID, FC_WRITE_LOB, &[]))
                .unwrap();
            if options & 0b_100 != 0 {
                break;
            }
        }
        assert_eq!(received, expected_cesu8, "CESU-8 content reassembled");

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();
        drain(stream);
    });

    let mut config = test_config(port);
    config.lob_write_length = 12; // force several write-lob round trips
    let connection = connect(&config).unwrap();
    let statement = connection.prepare("insert into T values (?)").unwrap();
    let reader: Arc<Mutex<dyn std::io::Read + Send>> =
        Arc::new(Mutex::new(std::io::Cursor::new(TEXT.as_bytes().to_vec())));
    let results = statement
        .execute(vec![Value::LobStream(Some(reader))])
        .unwrap();
    assert_eq!(ExecutionResult::count(&results), 1);
    drop(statement);
    drop(connection);
    server.join().unwrap();
}

#[test]
fn bulk_with_lobs_is_packaged_so_only_the_last_row_is_incomplete() {
    let (port, server) = spawn_server(|stream| {
        serve_authentication(stream, "TESTER", "geheim");

        let _prepare = read_request(stream).unwrap();
        let mut statement_id = Vec::new();
        statement_id.extend_from_slice(&12_u64.to_le_bytes());
        let mut parameter_metadata_bytes = parameter_metadata(3, 1, 10, 0); // IN INT
        parameter_metadata_bytes.extend_from_slice(&parameter_metadata(27, 1, -1, 0)); // IN BLOB
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_STATEMENT_ID, 1, statement_id),
                    RawPart::new(PART_KIND_PARAMETER_METADATA, 2, parameter_metadata_bytes),
                ],
            ))
            .unwrap();

        // package 1: rows 0 and 1; row 1 has the non-terminal LOB
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        let parameters = request.part_of_kind(PART_KIND_PARAMETERS).unwrap();
        assert_eq!(parameters.argument_count, 2, "package flushed at the open LOB");
        let mut locator = Vec::new();
        locator.extend_from_slice(&808_u64.to_le_bytes());
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[
                    RawPart::new(PART_KIND_EXECUTION_RESULTS, 2, execution_results),
                    RawPart::new(PART_KIND_WRITE_LOB_REPLY, 1, locator),
                ],
            ))
            .unwrap();

        // the open LOB of row 1 is finished before the next package
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_WRITE_LOB);
        let body = &request.part_of_kind(PART_KIND_WRITE_LOB_REQUEST).unwrap().body;
        assert_eq!(body[8] & 0b_100, 0b_100, "single final write chunk");
        stream
            .write_all(&build_reply(SESSION_ID, FC_WRITE_LOB, &[]))
            .unwrap();

        // package 2: the remaining row 2, complete within its first chunk
        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_EXECUTE);
        let parameters = request.part_of_kind(PART_KIND_PARAMETERS).unwrap();
        assert_eq!(parameters.argument_count, 1);
        let mut execution_results = Vec::new();
        execution_results.extend_from_slice(&1_i32.to_le_bytes());
        stream
            .write_all(&build_reply(
                SESSION_ID,
                FC_INSERT,
                &[RawPart::new(PART_KIND_EXECUTION_RESULTS, 1, execution_results)],
            ))
            .unwrap();

        let request = read_request(stream).unwrap();
        assert_eq!(request.message_type, MSG_TYPE_DROP_STATEMENT_ID);
        stream
            .write_all(&build_reply(SESSION_ID, FC_NIL, &[]))
            .unwrap();
        drain(stream);
    });

    let mut config = test_config(port);
    config.lob_write_length = 8;
    let connection = connect(&config).unwrap();
    let statement = connection.prepare("insert into L values (?, ?)").unwrap();

    let small = |bytes: &'static [u8]| {
        Value::LobStream(Some(Arc::new(Mutex::new(std::io::Cursor::new(bytes)))
            as Arc<Mutex<dyn std::io::Read + Send>>))
    };
    let results = statement
        .execute_batch(vec![
            vec![Value::Int(0), small(b"tiny")],           // fits the first chunk
            vec![Value::Int(1), small(b"0123456789abcde")], // does not fit: flush
            vec![Value::Int(2), small(b"wee")],            // fits again
        ])
        .unwrap();
    assert_eq!(ExecutionResult::count(&results), 3);
    drop(statement);
    drop(connection);
    server.join().unwrap();
}
