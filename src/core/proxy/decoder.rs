//! Proxy Protocol v2 header decoder
//!
//! Load balancers in front of the TCP listeners prepend a binary Proxy
//! Protocol v2 header to each connection. The decoder strips that header and
//! returns the original client/server addresses, leaving the remaining bytes
//! for the MLLP framer.
//!
//! Decoding never fails: anything that is not a well-formed v2 header is
//! treated as payload.

use crate::domain::{AddressFamily, ConnectionInfo};

/// Fixed 12-byte signature that opens every v2 header
pub const PROXY_V2_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];

/// Signature + version/command + family/protocol + 16-bit length
const HEADER_PREFIX_LEN: usize = 16;

const COMMAND_LOCAL: u8 = 0x0;
const COMMAND_PROXY: u8 = 0x1;

const TCP_OVER_IPV4: u8 = 0x11;
const TCP_OVER_IPV6: u8 = 0x21;

const IPV4_ADDR_LEN: usize = 4;
const IPV6_ADDR_LEN: usize = 16;

/// Outcome of [`decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDecodeResult<'a> {
    /// Addresses from a PROXY command header, `None` otherwise
    pub connection: Option<ConnectionInfo>,
    /// Bytes following the header (the whole input when no header was found)
    pub payload: &'a [u8],
}

impl<'a> ProxyDecodeResult<'a> {
    fn passthrough(data: &'a [u8]) -> Self {
        Self {
            connection: None,
            payload: data,
        }
    }
}

/// Returns true if `data` begins with the v2 signature
pub fn starts_with_signature(data: &[u8]) -> bool {
    data.starts_with(&PROXY_V2_SIGNATURE)
}

/// Declared total length of the v2 header at the start of `data`
///
/// Returns `None` until the signature and the 16-byte prefix are present.
pub fn header_len(data: &[u8]) -> Option<usize> {
    if data.len() < HEADER_PREFIX_LEN || !starts_with_signature(data) {
        return None;
    }
    Some(HEADER_PREFIX_LEN + usize::from(u16::from_be_bytes([data[14], data[15]])))
}

/// Decodes a Proxy Protocol v2 header at the start of `data`
///
/// `context_label` only appears in log lines (e.g. the listener name).
///
/// # Examples
///
/// ```
/// use nexus_ingest::core::proxy::decode;
///
/// let result = decode(b"MSH|^~\\&|", "mllp-2575");
/// assert!(result.connection.is_none());
/// assert_eq!(result.payload, b"MSH|^~\\&|");
/// ```
pub fn decode<'a>(data: &'a [u8], context_label: &str) -> ProxyDecodeResult<'a> {
    if data.len() < HEADER_PREFIX_LEN || !starts_with_signature(data) {
        tracing::debug!(
            context = context_label,
            data_len = data.len(),
            "No valid Proxy Protocol v2 signature found"
        );
        return ProxyDecodeResult::passthrough(data);
    }

    match decode_header(data, context_label) {
        Some(result) => result,
        None => {
            tracing::debug!(
                context = context_label,
                data_len = data.len(),
                "Truncated Proxy Protocol v2 header; treating input as payload"
            );
            ProxyDecodeResult::passthrough(data)
        }
    }
}

/// Returns `None` when the address block is truncated
fn decode_header<'a>(data: &'a [u8], context_label: &str) -> Option<ProxyDecodeResult<'a>> {
    let version_command = data[12];
    let family_protocol = data[13];
    let length = usize::from(u16::from_be_bytes([data[14], data[15]]));

    let version = version_command >> 4;
    let command = version_command & 0x0F;

    tracing::debug!(
        context = context_label,
        version,
        command = command_name(command),
        family_protocol = %format_args!("0x{family_protocol:02X}"),
        length,
        "Detected Proxy Protocol header"
    );
    if version != 2 {
        tracing::debug!(context = context_label, version, "Unsupported Proxy Protocol version");
    }

    let declared_end = HEADER_PREFIX_LEN + length;
    if declared_end > data.len() {
        tracing::debug!(
            context = context_label,
            header_end = declared_end,
            total = data.len(),
            "Header length exceeds total data length; clamping"
        );
    }
    let header_end = declared_end.min(data.len());

    let connection = match (command, family_protocol) {
        (COMMAND_LOCAL, _) => {
            tracing::debug!(context = context_label, "LOCAL command; ignoring address block");
            None
        }
        (COMMAND_PROXY, TCP_OVER_IPV4) => Some(read_addresses(
            data,
            IPV4_ADDR_LEN,
            format_ipv4,
            AddressFamily::IPv4,
        )?),
        (COMMAND_PROXY, TCP_OVER_IPV6) => Some(read_addresses(
            data,
            IPV6_ADDR_LEN,
            format_ipv6,
            AddressFamily::IPv6,
        )?),
        (COMMAND_PROXY, other) => {
            tracing::debug!(
                context = context_label,
                family_protocol = %format_args!("0x{other:02X}"),
                "Unsupported address family"
            );
            None
        }
        _ => None,
    };

    if let Some(info) = &connection {
        tracing::debug!(context = context_label, connection = %info, "Decoded proxied connection");
    }

    Some(ProxyDecodeResult {
        connection,
        payload: &data[header_end..],
    })
}

fn read_addresses(
    data: &[u8],
    addr_len: usize,
    format: fn(&[u8]) -> String,
    address_family: AddressFamily,
) -> Option<ConnectionInfo> {
    let block = data.get(HEADER_PREFIX_LEN..HEADER_PREFIX_LEN + addr_len * 2 + 4)?;
    let (src, rest) = block.split_at(addr_len);
    let (dst, ports) = rest.split_at(addr_len);

    Some(ConnectionInfo {
        source_ip: format(src),
        destination_ip: format(dst),
        source_port: u16::from_be_bytes([ports[0], ports[1]]),
        destination_port: u16::from_be_bytes([ports[2], ports[3]]),
        address_family,
    })
}

fn format_ipv4(addr: &[u8]) -> String {
    format!("{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
}

/// Eight zero-padded hex groups, no `::` compression
fn format_ipv6(addr: &[u8]) -> String {
    addr.chunks_exact(2)
        .map(|pair| format!("{:02x}{:02x}", pair[0], pair[1]))
        .collect::<Vec<_>>()
        .join(":")
}

fn command_name(command: u8) -> &'static str {
    match command {
        COMMAND_LOCAL => "LOCAL",
        COMMAND_PROXY => "PROXY",
        _ => "UNKNOWN",
    }
}

/// Splits a `host:port` socket address on its last colon
///
/// A leading `/` (as printed by some socket libraries) is removed. Returns
/// `None` when there is no colon.
pub fn parse_socket_address(address: &str) -> Option<(String, String)> {
    let (ip, port) = address.rsplit_once(':')?;
    let ip = ip.strip_prefix('/').unwrap_or(ip);
    Some((ip.to_string(), port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version_command: u8, family: u8, block: &[u8]) -> Vec<u8> {
        let mut out = PROXY_V2_SIGNATURE.to_vec();
        out.push(version_command);
        out.push(family);
        out.extend_from_slice(&(block.len() as u16).to_be_bytes());
        out.extend_from_slice(block);
        out
    }

    #[test]
    fn test_ipv4_header_sets_connection_and_payload() {
        let mut block = vec![10, 0, 0, 5, 10, 0, 0, 9];
        block.extend_from_slice(&51000u16.to_be_bytes());
        block.extend_from_slice(&2575u16.to_be_bytes());
        let mut data = header(0x21, TCP_OVER_IPV4, &block);
        data.extend_from_slice(b"HELLO");

        let result = decode(&data, "test");
        assert_eq!(
            result.connection,
            Some(ConnectionInfo {
                source_ip: "10.0.0.5".to_string(),
                destination_ip: "10.0.0.9".to_string(),
                source_port: 51000,
                destination_port: 2575,
                address_family: AddressFamily::IPv4,
            })
        );
        assert_eq!(result.payload, b"HELLO");
    }

    #[test]
    fn test_ipv6_header_formats_full_groups() {
        let mut src = [0u8; 16];
        let mut dst = [0u8; 16];
        src[15] = 1;
        dst[0] = 0x20;
        dst[1] = 0x01;
        dst[15] = 2;
        let mut block = src.to_vec();
        block.extend_from_slice(&dst);
        block.extend_from_slice(&1234u16.to_be_bytes());
        block.extend_from_slice(&4321u16.to_be_bytes());
        let data = header(0x21, TCP_OVER_IPV6, &block);

        let info = decode(&data, "test").connection.unwrap();
        assert_eq!(info.source_ip, "0000:0000:0000:0000:0000:0000:0000:0001");
        assert_eq!(info.destination_ip, "2001:0000:0000:0000:0000:0000:0000:0002");
        assert_eq!(info.source_port, 1234);
        assert_eq!(info.destination_port, 4321);
        assert_eq!(info.address_family, AddressFamily::IPv6);
    }

    #[test]
    fn test_local_command_skips_header() {
        let mut data = header(0x20, TCP_OVER_IPV4, &[0u8; 12]);
        data.extend_from_slice(b"PAYLOAD");

        let result = decode(&data, "test");
        assert!(result.connection.is_none());
        assert_eq!(result.payload, b"PAYLOAD");
    }

    #[test]
    fn test_unknown_family_still_skips_header() {
        // AF_UNIX stream, 216-byte address block
        let mut data = header(0x21, 0x31, &[7u8; 216]);
        data.extend_from_slice(b"rest");

        let result = decode(&data, "test");
        assert!(result.connection.is_none());
        assert_eq!(result.payload, b"rest");
    }

    #[test]
    fn test_length_overrun_is_clamped() {
        let mut data = PROXY_V2_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x20, 0x00, 0x01, 0x00]); // LOCAL, L = 256
        data.extend_from_slice(b"short");

        let result = decode(&data, "test");
        assert!(result.connection.is_none());
        assert!(result.payload.is_empty());
    }

    #[test]
    fn test_truncated_address_block_returns_original() {
        let mut data = PROXY_V2_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x21, TCP_OVER_IPV4, 0x00, 0x0C]);
        data.extend_from_slice(&[10, 0, 0]);

        let result = decode(&data, "test");
        assert!(result.connection.is_none());
        assert_eq!(result.payload, data.as_slice());
    }

    #[test]
    fn test_starts_with_signature() {
        assert!(starts_with_signature(&PROXY_V2_SIGNATURE));
        assert!(!starts_with_signature(&PROXY_V2_SIGNATURE[..11]));
        assert!(!starts_with_signature(b"PROXY TCP4 1.2.3.4"));
    }

    #[test]
    fn test_header_len() {
        let data = header(0x21, TCP_OVER_IPV4, &[0u8; 12]);
        assert_eq!(header_len(&data), Some(28));
        assert_eq!(header_len(&data[..15]), None);
        assert_eq!(header_len(b"MSH|^~\\&|A|B|C|D|E"), None);
    }

    #[test]
    fn test_parse_socket_address() {
        assert_eq!(
            parse_socket_address("/192.168.1.1:5000"),
            Some(("192.168.1.1".to_string(), "5000".to_string()))
        );
        assert_eq!(
            parse_socket_address("[::1]:2575"),
            Some(("[::1]".to_string(), "2575".to_string()))
        );
        assert_eq!(parse_socket_address("no-port"), None);
    }
}
