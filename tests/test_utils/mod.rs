//! Scripted in-process server for driving the client over a loopback
//! socket, plus byte-level builders for reply messages.

#![allow(dead_code)]

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

pub const SESSION_ID: i64 = 17;

// ---------------------------------------------------------------- parts

pub struct RawPart {
    pub kind: i8,
    pub attributes: u8,
    pub argument_count: i32,
    pub body: Vec<u8>,
}

impl RawPart {
    pub fn new(kind: i8, argument_count: i32, body: Vec<u8>) -> Self {
        Self {
            kind,
            attributes: 0,
            argument_count,
            body,
        }
    }

    pub fn with_attributes(mut self, attributes: u8) -> Self {
        self.attributes = attributes;
        self
    }
}

pub const PART_KIND_COMMAND: u8 = 3;
pub const PART_KIND_RESULT_SET: i8 = 5;
pub const PART_KIND_ERROR: i8 = 6;
pub const PART_KIND_STATEMENT_ID: i8 = 10;
pub const PART_KIND_EXECUTION_RESULTS: i8 = 12;
pub const PART_KIND_RESULT_SET_ID: i8 = 13;
pub const PART_KIND_READ_LOB_REQUEST: u8 = 17;
pub const PART_KIND_READ_LOB_REPLY: i8 = 18;
pub const PART_KIND_WRITE_LOB_REQUEST: u8 = 28;
pub const PART_KIND_WRITE_LOB_REPLY: i8 = 30;
pub const PART_KIND_PARAMETERS: u8 = 32;
pub const PART_KIND_AUTHENTICATION: u8 = 33;
pub const PART_KIND_OUTPUT_PARAMETERS: i8 = 41;
pub const PART_KIND_CONNECT_OPTIONS: i8 = 42;
pub const PART_KIND_FETCH_SIZE: u8 = 45;
pub const PART_KIND_PARAMETER_METADATA: i8 = 47;
pub const PART_KIND_RESULT_SET_METADATA: i8 = 48;

pub const ATTR_LAST_PACKET: u8 = 0b_0000_0001;
pub const ATTR_RESULT_SET_CLOSED: u8 = 0b_0001_0000;

pub const FC_NIL: i16 = 0;
pub const FC_DDL: i16 = 1;
pub const FC_INSERT: i16 = 2;
pub const FC_SELECT: i16 = 5;
pub const FC_DB_PROCEDURE_CALL: i16 = 8;
pub const FC_FETCH: i16 = 10;
pub const FC_WRITE_LOB: i16 = 15;
pub const FC_READ_LOB: i16 = 16;

pub const MSG_TYPE_EXECUTE_DIRECT: i8 = 2;
pub const MSG_TYPE_PREPARE: i8 = 3;
pub const MSG_TYPE_EXECUTE: i8 = 13;
pub const MSG_TYPE_READ_LOB: i8 = 16;
pub const MSG_TYPE_WRITE_LOB: i8 = 17;
pub const MSG_TYPE_AUTHENTICATE: i8 = 65;
pub const MSG_TYPE_CONNECT: i8 = 66;
pub const MSG_TYPE_CLOSE_RESULT_SET: i8 = 69;
pub const MSG_TYPE_DROP_STATEMENT_ID: i8 = 70;
pub const MSG_TYPE_FETCH_NEXT: i8 = 71;
pub const MSG_TYPE_DISCONNECT: i8 = 77;

fn padding(size: usize) -> usize {
    match size {
        0 => 0,
        _ => 7 - (size - 1) % 8,
    }
}

/// A complete reply message: header, one reply segment, parts, padding.
pub fn build_reply(session_id: i64, function_code: i16, parts: &[RawPart]) -> Vec<u8> {
    let parts_size: usize = parts
        .iter()
        .map(|p| 16 + p.body.len() + padding(p.body.len()))
        .sum();
    let varpart_length = (24 + parts_size) as u32;

    let mut w = Vec::new();
    // message header, 32 bytes
    w.write_i64::<LittleEndian>(session_id).unwrap();
    w.write_i32::<LittleEndian>(1).unwrap(); // packet count
    w.write_u32::<LittleEndian>(varpart_length).unwrap();
    w.write_u32::<LittleEndian>(varpart_length).unwrap();
    w.write_i16::<LittleEndian>(1).unwrap(); // segments
    w.extend_from_slice(&[0_u8; 10]);
    // segment header, 24 bytes
    w.write_i32::<LittleEndian>(varpart_length as i32).unwrap();
    w.write_i32::<LittleEndian>(0).unwrap();
    w.write_i16::<LittleEndian>(parts.len() as i16).unwrap();
    w.write_i16::<LittleEndian>(1).unwrap();
    w.write_i8(2).unwrap(); // segment kind: reply
    w.write_i8(0).unwrap(); // reserved
    w.write_i16::<LittleEndian>(function_code).unwrap();
    w.extend_from_slice(&[0_u8; 8]);
    // parts
    for part in parts {
        w.write_i8(part.kind).unwrap();
        w.write_u8(part.attributes).unwrap();
        if part.argument_count < i16::MAX as i32 {
            w.write_i16::<LittleEndian>(part.argument_count as i16).unwrap();
            w.write_i32::<LittleEndian>(0).unwrap();
        } else {
            w.write_i16::<LittleEndian>(-1).unwrap();
            w.write_i32::<LittleEndian>(part.argument_count).unwrap();
        }
        w.write_i32::<LittleEndian>(part.body.len() as i32).unwrap();
        w.write_i32::<LittleEndian>(0).unwrap();
        w.extend_from_slice(&part.body);
        w.extend_from_slice(&vec![0_u8; padding(part.body.len())]);
    }
    w
}

// ------------------------------------------------------------- payloads

/// Auth-field list: little-endian field count, then length-prefixed
/// fields (the big-endian escape for long fields).
pub fn auth_fields(fields: &[&[u8]]) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_i16::<LittleEndian>(fields.len() as i16).unwrap();
    for field in fields {
        assert!(field.len() <= 245, "test fields stay short");
        w.write_u8(field.len() as u8).unwrap();
        w.extend_from_slice(field);
    }
    w
}

pub fn option_int(key: u8, value: i32) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u8(key).unwrap();
    w.write_u8(3).unwrap();
    w.write_i32::<LittleEndian>(value).unwrap();
    w
}

pub fn option_string(key: u8, value: &str) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u8(key).unwrap();
    w.write_u8(29).unwrap();
    w.write_i16::<LittleEndian>(value.len() as i16).unwrap();
    w.extend_from_slice(value.as_bytes());
    w
}

/// One result-set-metadata column without names.
pub fn column_metadata(type_code: u8, nullable: bool, scale: i16, precision: i16) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u8(if nullable { 0b_10 } else { 0b_01 }).unwrap();
    w.write_u8(type_code).unwrap();
    w.write_i16::<LittleEndian>(scale).unwrap();
    w.write_i16::<LittleEndian>(precision).unwrap();
    w.write_i16::<LittleEndian>(0).unwrap();
    for _ in 0..4 {
        w.write_u32::<LittleEndian>(u32::MAX).unwrap(); // no names
    }
    w
}

/// One parameter descriptor without a name. direction: 1=IN 2=INOUT 4=OUT
pub fn parameter_metadata(type_code: u8, direction: u8, length: i16, fraction: i16) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u8(0b_01).unwrap(); // mandatory
    w.write_u8(type_code).unwrap();
    w.write_u8(direction).unwrap();
    w.write_u8(0).unwrap();
    w.write_u32::<LittleEndian>(u32::MAX).unwrap(); // no name
    w.write_i16::<LittleEndian>(length).unwrap();
    w.write_i16::<LittleEndian>(fraction).unwrap();
    w.write_u32::<LittleEndian>(0).unwrap();
    w
}

/// An output LOB cell with inline first chunk.
pub fn lob_cell(type_code: u8, last_data: bool, char_length: u64, byte_length: u64, locator_id: u64, chunk: &[u8]) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u8(type_code).unwrap();
    let mut options = 0b_10; // data included
    if last_data {
        options |= 0b_100;
    }
    w.write_u8(options).unwrap();
    w.extend_from_slice(&[0, 0]); // filler
    w.write_u64::<LittleEndian>(char_length).unwrap();
    w.write_u64::<LittleEndian>(byte_length).unwrap();
    w.write_u64::<LittleEndian>(locator_id).unwrap();
    w.write_u32::<LittleEndian>(chunk.len() as u32).unwrap();
    w.extend_from_slice(chunk);
    w
}

pub fn read_lob_reply_body(locator_id: u64, last_data: bool, data: &[u8]) -> Vec<u8> {
    let mut w = Vec::new();
    w.write_u64::<LittleEndian>(locator_id).unwrap();
    w.write_u8(if last_data { 0b_100 } else { 0 }).unwrap();
    w.write_i32::<LittleEndian>(data.len() as i32).unwrap();
    w.extend_from_slice(&[0, 0, 0]); // filler
    w.extend_from_slice(data);
    w
}

// ------------------------------------------------------------- requests

pub struct ReceivedRequest {
    pub message_type: i8,
    pub auto_commit: bool,
    pub parts: Vec<ReceivedPart>,
}

pub struct ReceivedPart {
    pub kind: u8,
    pub argument_count: i32,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    pub fn part_of_kind(&self, kind: u8) -> Option<&ReceivedPart> {
        self.parts.iter().find(|p| p.kind == kind)
    }
}

/// Reads one request message; None on a clean EOF.
pub fn read_request(stream: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut header = [0_u8; 32];
    if stream.read_exact(&mut header).is_err() {
        return None;
    }
    let varpart_length =
        u32::from_le_bytes([header[12], header[13], header[14], header[15]]) as usize;
    let mut varpart = vec![0_u8; varpart_length];
    stream.read_exact(&mut varpart).ok()?;

    let no_of_parts = i16::from_le_bytes([varpart[8], varpart[9]]);
    let message_type = varpart[13] as i8;
    let auto_commit = varpart[14] != 0;

    let mut parts = Vec::new();
    let mut pos = 24;
    for _ in 0..no_of_parts {
        let kind = varpart[pos];
        let small = i16::from_le_bytes([varpart[pos + 2], varpart[pos + 3]]);
        let big = i32::from_le_bytes([
            varpart[pos + 4],
            varpart[pos + 5],
            varpart[pos + 6],
            varpart[pos + 7],
        ]);
        let argument_count = std::cmp::max(i32::from(small), big);
        let body_len = i32::from_le_bytes([
            varpart[pos + 8],
            varpart[pos + 9],
            varpart[pos + 10],
            varpart[pos + 11],
        ]) as usize;
        let body = varpart[pos + 16..pos + 16 + body_len].to_vec();
        pos += 16 + body_len + padding(body_len);
        parts.push(ReceivedPart {
            kind,
            argument_count,
            body,
        });
    }
    Some(ReceivedRequest {
        message_type,
        auto_commit,
        parts,
    })
}

/// Splits an auth-field list into its raw fields.
pub fn parse_auth_fields(body: &[u8]) -> Vec<Vec<u8>> {
    let mut rdr = std::io::Cursor::new(body);
    let count = rdr.read_u16::<LittleEndian>().unwrap();
    let mut fields = Vec::new();
    for _ in 0..count {
        let len = match rdr.read_u8().unwrap() {
            255 => rdr.read_u16::<byteorder::BigEndian>().unwrap() as usize,
            l => l as usize,
        };
        let mut field = vec![0_u8; len];
        rdr.read_exact(&mut field).unwrap();
        fields.push(field);
    }
    fields
}

// ---------------------------------------------------------------- scram

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256(data: &[u8]) -> Vec<u8> {
    let mut sha = Sha256::new();
    sha.update(data);
    sha.finalize().to_vec()
}

pub struct ScramServer {
    pub salt: Vec<u8>,
    pub server_nonce: Vec<u8>,
    password: String,
}

impl ScramServer {
    pub fn new(password: &str) -> Self {
        Self {
            salt: (1..=16).collect(),
            server_nonce: (100..=147).collect(),
            password: password.to_string(),
        }
    }

    pub fn challenge(&self) -> Vec<u8> {
        auth_fields(&[&self.salt, &self.server_nonce])
    }

    pub fn expected_client_proof(&self, client_challenge: &[u8]) -> Vec<u8> {
        let salted_password = hmac_sha256(self.password.as_bytes(), &self.salt);
        let client_key = sha256(&salted_password);
        let mut content = self.salt.clone();
        content.extend_from_slice(&self.server_nonce);
        content.extend_from_slice(client_challenge);
        let signature = hmac_sha256(&sha256(&client_key), &content);
        signature
            .iter()
            .zip(client_key.iter())
            .map(|(a, b)| a ^ b)
            .collect()
    }

    pub fn server_proof(&self) -> Vec<u8> {
        let salted_password = hmac_sha256(self.password.as_bytes(), &self.salt);
        let client_key = sha256(&salted_password);
        let server_verifier = hmac_sha256(&salted_password, &self.salt);
        let mut content = client_key;
        content.extend_from_slice(&self.salt);
        content.extend_from_slice(&self.server_nonce);
        hmac_sha256(&server_verifier, &content)
    }
}

// ----------------------------------------------------------- the server

/// Starts a one-connection scripted server; returns its port and the
/// handle of the serving thread.
pub fn spawn_server<F>(script: F) -> (u16, std::thread::JoinHandle<()>)
where
    F: FnOnce(&mut TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            stream.set_nodelay(true).ok();
            script(&mut stream);
        }
    });
    (port, handle)
}

/// The connection prolog: 14 bytes in, 8 bytes out.
pub fn serve_prolog(stream: &mut TcpStream) {
    let mut prolog = [0_u8; 14];
    stream.read_exact(&mut prolog).unwrap();
    assert_eq!(&prolog[..4], &[255, 255, 255, 255]);
    stream.write_all(&[0_u8; 8]).unwrap();
}

/// Serves prolog plus a complete SCRAMSHA256 handshake for the given
/// user/password, granting data format version 8.
pub fn serve_authentication(stream: &mut TcpStream, user: &str, password: &str) {
    serve_prolog(stream);
    let scram = ScramServer::new(password);

    // round 1: method selection
    let request = read_request(stream).unwrap();
    assert_eq!(request.message_type, MSG_TYPE_AUTHENTICATE);
    let offered = parse_auth_fields(&request.part_of_kind(PART_KIND_AUTHENTICATION).unwrap().body);
    assert_eq!(offered[0], user.as_bytes());
    // [user, name1, data1, name2, data2]: password logon offers the two
    // SCRAM variants
    assert_eq!(offered.len(), 5);
    let index = offered
        .iter()
        .position(|f| f == b"SCRAMSHA256")
        .expect("SCRAMSHA256 must be offered");
    let client_challenge = offered[index + 1].clone();

    let reply = build_reply(
        0,
        FC_NIL,
        &[RawPart::new(
            PART_KIND_AUTHENTICATION as i8,
            1,
            auth_fields(&[b"SCRAMSHA256", &scram.challenge()]),
        )],
    );
    stream.write_all(&reply).unwrap();

    // round 2: proof and connect options
    let request = read_request(stream).unwrap();
    assert_eq!(request.message_type, MSG_TYPE_CONNECT);
    let fields = parse_auth_fields(&request.part_of_kind(PART_KIND_AUTHENTICATION).unwrap().body);
    assert_eq!(fields[1], b"SCRAMSHA256");
    // the proof is itself an auth-field list with the single 32-byte proof
    let proof_fields = parse_auth_fields(&fields[2]);
    assert_eq!(
        proof_fields[0],
        scram.expected_client_proof(&client_challenge),
        "client proof mismatch"
    );

    let mut connect_options = Vec::new();
    connect_options.extend_from_slice(&option_int(1, 4711)); // connection id
    connect_options.extend_from_slice(&option_int(23, 8)); // granted dfv
    connect_options.extend_from_slice(&option_string(44, "2.00.048.00.1592305219"));
    let reply = build_reply(
        SESSION_ID,
        FC_NIL,
        &[
            RawPart::new(
                PART_KIND_AUTHENTICATION as i8,
                1,
                auth_fields(&[b"SCRAMSHA256", &auth_fields(&[&scram.server_proof()])]),
            ),
            RawPart::new(PART_KIND_CONNECT_OPTIONS, 3, connect_options),
        ],
    );
    stream.write_all(&reply).unwrap();
}

/// Absorbs trailing traffic (disconnect and the like) until EOF.
pub fn drain(stream: &mut TcpStream) {
    while read_request(stream).is_some() {}
}

pub fn test_config(port: u16) -> scnp::ConnectConfiguration {
    scnp::ConnectConfiguration::new(
        "127.0.0.1",
        port,
        scnp::Credentials::with_password("TESTER", "geheim"),
    )
}
