use crate::base::RsState;
use crate::conn::SessionRef;
use crate::protocol::parts::{
    AuthFields, ClientContext, ClientInfo, ConnectOptionsPart, DbConnectInfo, ExecutionResult,
    LobFlags, OutputParameters, ParameterDescriptors, ParameterRows, ReadLobReply, ReadLobRequest,
    ResultSetMetadata, ServerError, StatementContext, TransactionFlags, WriteLobReply,
    WriteLobRequest,
};
use crate::protocol::{util, PartAttributes, PartKind, Parts};
use crate::scnp_error::prot_err;
use crate::ScnpResult;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::sync::Arc;

pub(crate) const PART_HEADER_SIZE: usize = 16;

// One typed payload unit. Which variants occur on which side differs:
// some are written only by the client (Command, Parameters, FetchSize...),
// some only arrive in replies (Error, StatementId, OutputParameters...),
// several travel in both directions (Auth, ConnectOptions, DbConnectInfo).
#[derive(Debug)]
pub(crate) enum Part<'a> {
    Auth(AuthFields),
    ClientContext(ClientContext),
    ClientId(String),
    ClientInfo(ClientInfo),
    Command(&'a str),
    ConnectOptions(ConnectOptionsPart),
    DbConnectInfo(DbConnectInfo),
    Error(Vec<ServerError>),
    ExecutionResults(Vec<ExecutionResult>),
    FetchSize(u32),
    LobFlags(LobFlags),
    OutputParameters(OutputParameters),
    ParameterMetadata(Arc<ParameterDescriptors>),
    Parameters(ParameterRows<'a>),
    ReadLobRequest(ReadLobRequest),
    ReadLobReply(ReadLobReply),
    ResultSet(Option<RsState>),
    ResultSetId(u64),
    ResultSetMetadata(ResultSetMetadata),
    StatementContext(StatementContext),
    StatementId(u64),
    TransactionFlags(TransactionFlags),
    WriteLobRequest(WriteLobRequest<'a>),
    WriteLobReply(WriteLobReply),
}

impl<'a> Part<'a> {
    pub fn kind(&self) -> PartKind {
        match self {
            Self::Auth(_) => PartKind::Authentication,
            Self::ClientContext(_) => PartKind::ClientContext,
            Self::ClientId(_) => PartKind::ClientId,
            Self::ClientInfo(_) => PartKind::ClientInfo,
            Self::Command(_) => PartKind::Command,
            Self::ConnectOptions(_) => PartKind::ConnectOptions,
            Self::DbConnectInfo(_) => PartKind::DbConnectInfo,
            Self::Error(_) => PartKind::Error,
            Self::ExecutionResults(_) => PartKind::ExecutionResults,
            Self::FetchSize(_) => PartKind::FetchSize,
            Self::LobFlags(_) => PartKind::LobFlags,
            Self::OutputParameters(_) => PartKind::OutputParameters,
            Self::ParameterMetadata(_) => PartKind::ParameterMetadata,
            Self::Parameters(_) => PartKind::Parameters,
            Self::ReadLobRequest(_) => PartKind::ReadLobRequest,
            Self::ReadLobReply(_) => PartKind::ReadLobReply,
            Self::ResultSet(_) => PartKind::ResultSet,
            Self::ResultSetId(_) => PartKind::ResultSetId,
            Self::ResultSetMetadata(_) => PartKind::ResultSetMetadata,
            Self::StatementContext(_) => PartKind::StatementContext,
            Self::StatementId(_) => PartKind::StatementId,
            Self::TransactionFlags(_) => PartKind::TransactionFlags,
            Self::WriteLobRequest(_) => PartKind::WriteLobRequest,
            Self::WriteLobReply(_) => PartKind::WriteLobReply,
        }
    }

    // The argument count that goes into the part header. For option bags
    // it is the number of entries, for parameter rows the number of rows,
    // for most one-shot parts just 1.
    fn count(&self) -> ScnpResult<usize> {
        Ok(match self {
            Self::Auth(_)
            | Self::ClientId(_)
            | Self::Command(_)
            | Self::FetchSize(_)
            | Self::ResultSetId(_)
            | Self::StatementId(_)
            | Self::ReadLobRequest(_)
            | Self::WriteLobRequest(_) => 1,
            Self::ClientContext(opts) => opts.len(),
            Self::ClientInfo(client_info) => client_info.count(),
            Self::ConnectOptions(opts) => opts.len(),
            Self::DbConnectInfo(opts) => opts.len(),
            Self::LobFlags(opts) => opts.len(),
            Self::Parameters(rows) => rows.count(),
            Self::StatementContext(opts) => opts.len(),
            Self::TransactionFlags(opts) => opts.len(),
            part => {
                return Err(prot_err!("count() called on read-only part {part:?}"));
            }
        })
    }

    pub fn size(
        &self,
        with_padding: bool,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
    ) -> ScnpResult<usize> {
        Ok(PART_HEADER_SIZE + self.body_size(with_padding, o_a_descriptors)?)
    }

    fn body_size(
        &self,
        with_padding: bool,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
    ) -> ScnpResult<usize> {
        let mut size = match self {
            Self::Auth(auth_fields) => auth_fields.size(),
            Self::ClientContext(opts) => opts.size(),
            Self::ClientId(client_id) => client_id.len(),
            Self::ClientInfo(client_info) => client_info.size(),
            Self::Command(sql) => util::cesu8_length(sql),
            Self::ConnectOptions(opts) => opts.size(),
            Self::DbConnectInfo(opts) => opts.size(),
            Self::FetchSize(_) => 4,
            Self::LobFlags(opts) => opts.size(),
            Self::Parameters(rows) => {
                let descriptors = o_a_descriptors
                    .ok_or_else(|| prot_err!("Parameters part needs descriptors"))?;
                rows.size(descriptors)?
            }
            Self::ReadLobRequest(_) => ReadLobRequest::size(),
            Self::ResultSetId(_) | Self::StatementId(_) => 8,
            Self::StatementContext(opts) => opts.size(),
            Self::TransactionFlags(opts) => opts.size(),
            Self::WriteLobRequest(request) => request.size(),
            part => {
                return Err(prot_err!("body_size() called on read-only part {part:?}"));
            }
        };
        if with_padding {
            size += padsize(size);
        }
        Ok(size)
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    pub fn emit(
        &self,
        mut remaining_bufsize: u32,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        w: &mut dyn std::io::Write,
    ) -> ScnpResult<u32> {
        trace!("emitting part of kind {:?}", self.kind());
        let body_size = self.body_size(false, o_a_descriptors)?;

        // PART HEADER, 16 bytes
        w.write_i8(self.kind() as i8)?;
        w.write_u8(0)?; // attributes are not used in requests
        match self.count()? {
            count if count < i16::MAX as usize => {
                w.write_i16::<LittleEndian>(count as i16)?;
                w.write_i32::<LittleEndian>(0)?;
            }
            count if i32::try_from(count).is_ok() => {
                // the small field overflows into the big one
                w.write_i16::<LittleEndian>(-1)?;
                w.write_i32::<LittleEndian>(count as i32)?;
            }
            _ => {
                return Err(prot_err!("part argument count exceeds i32::MAX"));
            }
        }
        w.write_i32::<LittleEndian>(body_size as i32)?;
        w.write_i32::<LittleEndian>(remaining_bufsize as i32)?;
        remaining_bufsize -= PART_HEADER_SIZE as u32;

        match self {
            Self::Auth(auth_fields) => auth_fields.emit(w)?,
            Self::ClientContext(opts) => opts.emit(w)?,
            Self::ClientId(client_id) => w.write_all(client_id.as_bytes())?,
            Self::ClientInfo(client_info) => client_info.emit(w)?,
            Self::Command(sql) => w.write_all(&util::to_cesu8(sql))?,
            Self::ConnectOptions(opts) => opts.emit(w)?,
            Self::DbConnectInfo(opts) => opts.emit(w)?,
            Self::FetchSize(fetch_size) => w.write_u32::<LittleEndian>(*fetch_size)?,
            Self::LobFlags(opts) => opts.emit(w)?,
            Self::Parameters(rows) => {
                let descriptors = o_a_descriptors
                    .ok_or_else(|| prot_err!("Parameters part needs descriptors"))?;
                rows.emit(descriptors, w)?;
            }
            Self::ReadLobRequest(request) => request.emit(w)?,
            Self::ResultSetId(rs_id) => w.write_u64::<LittleEndian>(*rs_id)?,
            Self::StatementContext(opts) => opts.emit(w)?,
            Self::StatementId(statement_id) => w.write_u64::<LittleEndian>(*statement_id)?,
            Self::TransactionFlags(opts) => opts.emit(w)?,
            Self::WriteLobRequest(request) => request.emit(w)?,
            part => {
                return Err(prot_err!("emit() called on read-only part {part:?}"));
            }
        }

        // zero padding to the next multiple of 8
        let padsize = padsize(body_size);
        for _ in 0..padsize {
            w.write_u8(0)?;
        }
        Ok(remaining_bufsize - body_size as u32 - padsize as u32)
    }

    // Parses one part from the buffered reply. `last` marks the final
    // part of the segment, after which no padding is required. Part kinds
    // that carry nothing this driver acts on are skipped by byte length
    // and yield None.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn parse(
        already_received_parts: &mut Parts,
        session: Option<&SessionRef>,
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        o_rs: &mut Option<&mut RsState>,
        last: bool,
        rdr: &mut std::io::Cursor<Vec<u8>>,
    ) -> ScnpResult<Option<Part<'static>>> {
        let (kind, attributes, body_size, no_of_args) = parse_header(rdr)?;
        debug!(
            "parsing part of kind {kind:?} with attributes {attributes:?}, \
             body size {body_size}, {no_of_args} arguments"
        );
        let start = rdr.position();

        if kind.is_skippable() {
            util::skip_bytes(body_size, rdr)?;
            if !last {
                util::skip_bytes(padsize(body_size), rdr)?;
            }
            return Ok(None);
        }

        let part = Part::parse_body(
            kind,
            attributes,
            no_of_args,
            already_received_parts,
            session,
            o_a_rsmd,
            o_a_descriptors,
            o_rs,
            rdr,
        )?;

        // the decoder must consume exactly the declared body
        let consumed = rdr.position() - start;
        if consumed != body_size as u64 {
            return Err(prot_err!(
                "part decoder for {kind:?} consumed {consumed} bytes instead of {body_size}"
            ));
        }
        if !last {
            util::skip_bytes(padsize(body_size), rdr)?;
        }
        Ok(Some(part))
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_body(
        kind: PartKind,
        attributes: PartAttributes,
        no_of_args: usize,
        parts: &mut Parts,
        session: Option<&SessionRef>,
        o_a_rsmd: Option<&Arc<ResultSetMetadata>>,
        o_a_descriptors: Option<&Arc<ParameterDescriptors>>,
        o_rs: &mut Option<&mut RsState>,
        rdr: &mut std::io::Cursor<Vec<u8>>,
    ) -> ScnpResult<Part<'static>> {
        Ok(match kind {
            PartKind::Authentication => Part::Auth(AuthFields::parse(rdr)?),
            PartKind::ConnectOptions => {
                Part::ConnectOptions(ConnectOptionsPart::parse(no_of_args, rdr)?)
            }
            PartKind::DbConnectInfo => Part::DbConnectInfo(DbConnectInfo::parse(no_of_args, rdr)?),
            PartKind::Error => Part::Error(ServerError::parse(no_of_args, rdr)?),
            PartKind::ExecutionResults => {
                Part::ExecutionResults(ExecutionResult::parse(no_of_args, rdr)?)
            }
            PartKind::OutputParameters => {
                let session =
                    session.ok_or_else(|| prot_err!("OutputParameters need a session"))?;
                let descriptors = o_a_descriptors
                    .ok_or_else(|| prot_err!("OutputParameters need descriptors"))?;
                Part::OutputParameters(OutputParameters::parse(session, descriptors, rdr)?)
            }
            PartKind::ParameterMetadata => Part::ParameterMetadata(Arc::new(
                ParameterDescriptors::parse(no_of_args, rdr)?,
            )),
            PartKind::ReadLobReply => Part::ReadLobReply(ReadLobReply::parse(rdr)?),
            PartKind::WriteLobReply => Part::WriteLobReply(WriteLobReply::parse(no_of_args, rdr)?),
            PartKind::ResultSet => {
                let session = session.ok_or_else(|| prot_err!("ResultSet needs a session"))?;
                Part::ResultSet(RsState::parse_rows_part(
                    no_of_args, attributes, parts, session, o_a_rsmd, o_rs, rdr,
                )?)
            }
            PartKind::ResultSetId => Part::ResultSetId(rdr.read_u64::<LittleEndian>()?),
            PartKind::ResultSetMetadata => {
                Part::ResultSetMetadata(ResultSetMetadata::parse(no_of_args, rdr)?)
            }
            PartKind::StatementContext => {
                Part::StatementContext(StatementContext::parse(no_of_args, rdr)?)
            }
            PartKind::StatementId => Part::StatementId(rdr.read_u64::<LittleEndian>()?),
            PartKind::TransactionFlags => {
                Part::TransactionFlags(TransactionFlags::parse(no_of_args, rdr)?)
            }
            kind => {
                return Err(prot_err!("no parse implemented for part kind {kind:?}"));
            }
        })
    }
}

#[allow(clippy::cast_sign_loss)]
fn parse_header(
    rdr: &mut std::io::Cursor<Vec<u8>>,
) -> ScnpResult<(PartKind, PartAttributes, usize, usize)> {
    // PART HEADER, 16 bytes
    let kind = PartKind::from_i8(rdr.read_i8()?)?;
    let attributes = PartAttributes::new(rdr.read_u8()?);
    let no_of_args_i16 = rdr.read_i16::<LittleEndian>()?;
    let no_of_args_i32 = rdr.read_i32::<LittleEndian>()?;
    let body_size = rdr.read_i32::<LittleEndian>()?;
    rdr.read_i32::<LittleEndian>()?; // remaining buffer size
    let no_of_args = std::cmp::max(i32::from(no_of_args_i16), no_of_args_i32);
    Ok((kind, attributes, body_size as usize, no_of_args as usize))
}

pub(crate) fn padsize(size: usize) -> usize {
    match size {
        0 => 0,
        _ => 7 - (size - 1) % 8,
    }
}
