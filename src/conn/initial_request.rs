use crate::conn::TcpClient;
use crate::protocol::util;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use std::sync::OnceLock;

// The prolog that precedes the first message on a fresh connection:
// product and protocol version, endianness, and an option count. The
// server answers with 8 bytes whose content does not matter to us; not
// getting them is fatal.
pub(crate) fn send_and_receive(tcp_client: &mut TcpClient) -> std::io::Result<()> {
    trace!("sending the initial request");
    let w = tcp_client.writer();
    w.write_all(initial_request())?;
    w.flush()?;

    util::skip_bytes(8, tcp_client.reader()).map_err(|e| {
        trace!("reading the initial reply failed with {e:?}");
        e
    })?;
    debug!("connection is initialized");
    Ok(())
}

fn initial_request() -> &'static [u8] {
    static INITIAL_REQUEST: OnceLock<Box<[u8]>> = OnceLock::new();
    INITIAL_REQUEST.get_or_init(|| {
        const FILLER: i32 = -1;
        const MAJOR_PRODUCT_VERSION: i8 = 4;
        const MINOR_PRODUCT_VERSION: i16 = 20;
        const MAJOR_PROTOCOL_VERSION: i8 = 4;
        const MINOR_PROTOCOL_VERSION: i16 = 1;
        const RESERVED: i8 = 0;
        const NUMBER_OF_OPTIONS: i8 = 1;
        const OPTION_ID_SWAPKIND: i8 = 1;
        const LITTLE_ENDIAN: i8 = 1;

        let mut c = std::io::Cursor::new(Vec::with_capacity(14));
        c.write_all(&FILLER.to_be_bytes()).unwrap();
        c.write_i8(MAJOR_PRODUCT_VERSION).unwrap();
        c.write_i16::<BigEndian>(MINOR_PRODUCT_VERSION).unwrap();
        c.write_i8(MAJOR_PROTOCOL_VERSION).unwrap();
        c.write_i16::<BigEndian>(MINOR_PROTOCOL_VERSION).unwrap();
        c.write_i8(RESERVED).unwrap();
        c.write_i8(NUMBER_OF_OPTIONS).unwrap();
        c.write_i8(OPTION_ID_SWAPKIND).unwrap();
        c.write_i8(LITTLE_ENDIAN).unwrap();
        let res = c.into_inner().into_boxed_slice();
        assert_eq!(res.len(), 14);
        res
    })
}

#[cfg(test)]
mod tests {
    #[test]
    fn the_initial_request_is_byte_stable() {
        let bytes = super::initial_request();
        assert_eq!(
            bytes,
            &[255, 255, 255, 255, 4, 0, 20, 4, 0, 1, 0, 1, 1, 1]
        );
    }
}
