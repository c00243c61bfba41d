//! Integration tests for proxy header decoding and message group assignment

use nexus_ingest::core::proxy::{decode, decoder::PROXY_V2_SIGNATURE};
use nexus_ingest::core::routing::{GroupKeyStrategy, MessageGroupService};
use nexus_ingest::domain::interaction::{DELIVERY_TYPE, FACILITY, MESSAGE_CODE};
use nexus_ingest::domain::{
    AddressFamily, ConnectionInfo, InteractionContext, MessageSourceType,
    DEFAULT_MESSAGE_GROUP_ID, UNKNOWN_MESSAGE_GROUP_ID,
};
use test_case::test_case;

fn ipv4_header(version_command: u8) -> Vec<u8> {
    let mut data = PROXY_V2_SIGNATURE.to_vec();
    data.push(version_command);
    data.push(0x11);
    data.extend_from_slice(&12u16.to_be_bytes());
    data.extend_from_slice(&[10, 0, 0, 5]);
    data.extend_from_slice(&[10, 0, 0, 9]);
    data.extend_from_slice(&51000u16.to_be_bytes());
    data.extend_from_slice(&2575u16.to_be_bytes());
    data
}

#[test]
fn test_proxy_header_decodes_addresses_and_payload() {
    let mut data = ipv4_header(0x21);
    data.extend_from_slice(b"HELLO");

    let result = decode(&data, "integration");
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
fn test_local_command_strips_header_only() {
    let mut data = ipv4_header(0x20);
    data.extend_from_slice(b"MSH|^~\\&|");

    let result = decode(&data, "integration");
    assert!(result.connection.is_none());
    assert_eq!(result.payload, b"MSH|^~\\&|");
}

#[test_case(b"" ; "empty")]
#[test_case(b"HELLO" ; "short plain")]
#[test_case(&PROXY_V2_SIGNATURE ; "bare signature")]
#[test_case(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n" ; "no signature")]
#[test_case(b"\r\n\r\n\0\r\nQUIZ\nXXXX" ; "signature typo")]
fn test_malformed_input_passes_through(data: &[u8]) {
    let result = decode(data, "integration");
    assert!(result.connection.is_none());
    assert_eq!(result.payload, data);
}

#[test]
fn test_tcp_group_is_destination_port() {
    let mut ctx = InteractionContext::new(MessageSourceType::Tcp);
    ctx.destination_port = Some("2575".to_string());

    assert_eq!(MessageGroupService::new().assign(&mut ctx), "2575");
}

#[test]
fn test_tenant_preempts_ip_port_fallback() {
    let mut ctx = InteractionContext::new(MessageSourceType::Http);
    ctx.tenant_id = Some("acme-hospital".to_string());
    ctx.source_ip = Some("10.0.0.5".to_string());
    ctx.destination_ip = Some("10.0.0.9".to_string());

    let (strategy, group_id) = MessageGroupService::new().resolve(&ctx);
    assert_eq!(strategy, GroupKeyStrategy::Tenant);
    assert_eq!(group_id, "acme-hospital");
}

#[test]
fn test_mllp_facility_only() {
    let mut ctx = InteractionContext::new(MessageSourceType::Mllp);
    ctx.additional_parameters
        .insert(FACILITY.to_string(), "ER".to_string());

    assert_eq!(MessageGroupService::new().assign(&mut ctx), "ER");
}

#[test]
fn test_mllp_joins_all_fields_in_order() {
    let mut ctx = InteractionContext::new(MessageSourceType::Mllp);
    ctx.additional_parameters
        .insert(MESSAGE_CODE.to_string(), " ORU ".to_string());
    ctx.additional_parameters
        .insert(FACILITY.to_string(), "ER".to_string());
    ctx.additional_parameters
        .insert(DELIVERY_TYPE.to_string(), "HL7".to_string());

    assert_eq!(MessageGroupService::new().assign(&mut ctx), "HL7_ER_ORU");
}

#[test]
fn test_mllp_without_fields_or_port_uses_default() {
    let mut ctx = InteractionContext::new(MessageSourceType::Mllp);
    ctx.additional_parameters
        .insert(FACILITY.to_string(), "   ".to_string());

    assert_eq!(
        MessageGroupService::new().assign(&mut ctx),
        DEFAULT_MESSAGE_GROUP_ID
    );
}

#[test]
fn test_fallback_sentinels_differ() {
    let ctx = InteractionContext::new(MessageSourceType::Soap);
    let (strategy, group_id) = MessageGroupService::new().resolve(&ctx);

    assert_eq!(strategy, GroupKeyStrategy::IpPortFallback);
    assert_eq!(group_id, UNKNOWN_MESSAGE_GROUP_ID);
    assert_ne!(UNKNOWN_MESSAGE_GROUP_ID, DEFAULT_MESSAGE_GROUP_ID);
}

#[test]
fn test_ip_port_fallback_joins_addresses() {
    let mut ctx = InteractionContext::new(MessageSourceType::Http);
    ctx.source_ip = Some("10.0.0.5".to_string());
    ctx.destination_port = Some("443".to_string());

    assert_eq!(MessageGroupService::new().assign(&mut ctx), "10.0.0.5_443");
}

#[test]
fn test_decoded_proxy_info_feeds_group_assignment() {
    let data = ipv4_header(0x21);
    let info = decode(&data, "integration").connection.unwrap();

    let mut ctx = InteractionContext::new(MessageSourceType::Tcp);
    ctx.apply_connection_info(&info);
    ctx.apply_socket_addresses(None, Some(("172.16.0.2".to_string(), "7001".to_string())));

    assert_eq!(MessageGroupService::new().assign(&mut ctx), "2575");
}
