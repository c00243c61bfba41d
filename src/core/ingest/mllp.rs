//! MLLP framing and the handful of HL7 v2 fields the gateway reads
//!
//! Only the MSH header and the site-specific ZNT segment are inspected; the
//! rest of the message is carried through untouched.

use crate::domain::interaction::{DELIVERY_TYPE, FACILITY, MESSAGE_CODE};
use crate::domain::{GatewayError, Result};
use chrono::Utc;
use std::collections::BTreeMap;

/// Start-of-block byte (VT)
pub const START_BLOCK: u8 = 0x0B;
/// End-of-block byte (FS)
pub const END_BLOCK: u8 = 0x1C;
/// Trailing carriage return after the end-of-block byte
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// User agent reported when MSH-3 and MSH-4 are both empty
pub const DEFAULT_USER_AGENT: &str = "MLLP Listener";

const HL7_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Returns the index of the end-of-block byte, if the frame is complete
///
/// A frame is complete once `FS` is seen; the trailing `CR` is optional
/// because some senders omit it.
pub fn find_frame_end(data: &[u8]) -> Option<usize> {
    let start = data.iter().position(|b| *b == START_BLOCK).unwrap_or(0);
    data[start..]
        .iter()
        .position(|b| *b == END_BLOCK)
        .map(|offset| start + offset)
}

/// Strips the MLLP envelope, returning the inner message
///
/// Input without a start-of-block byte is returned as-is so that plain HL7
/// sent to an MLLP port is still processed.
pub fn unwrap_frame(data: &[u8]) -> &[u8] {
    let Some(start) = data.iter().position(|b| *b == START_BLOCK) else {
        return data;
    };
    let body = &data[start + 1..];
    match body.iter().position(|b| *b == END_BLOCK) {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Wraps `message` in an MLLP envelope
pub fn wrap_frame(message: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(message.len() + 3);
    framed.push(START_BLOCK);
    framed.extend_from_slice(message);
    framed.push(END_BLOCK);
    framed.push(CARRIAGE_RETURN);
    framed
}

fn segments(message: &str) -> impl Iterator<Item = &str> {
    message
        .split(['\r', '\n'])
        .filter(|segment| !segment.is_empty())
}

/// Parsed MSH header fields, indexed the HL7 way (MSH-1 is the separator)
#[derive(Debug, Clone)]
struct MshHeader<'a> {
    separator: char,
    fields: Vec<&'a str>,
}

impl<'a> MshHeader<'a> {
    fn parse(message: &'a str) -> Option<Self> {
        let line = segments(message).next()?;
        if !line.starts_with("MSH") {
            return None;
        }
        let separator = line[3..].chars().next()?;
        Some(Self {
            separator,
            fields: line.split(separator).collect(),
        })
    }

    /// MSH-n; MSH-1 is the separator itself so MSH-n lives at index n-1
    fn field(&self, n: usize) -> &'a str {
        n.checked_sub(1)
            .and_then(|index| self.fields.get(index))
            .copied()
            .unwrap_or("")
    }
}

/// Values read from the ZNT segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZntFields {
    pub message_code: Option<String>,
    pub delivery_type: Option<String>,
    pub facility: Option<String>,
}

impl ZntFields {
    /// Reads ZNT-2.1, ZNT-4.1 and ZNT-8.1 from the first ZNT segment
    ///
    /// For ZNT-8 the facility code is the text after the first `:`
    /// (`HOSP:ER` becomes `ER`). Returns `None` when there is no ZNT segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_ingest::core::ingest::ZntFields;
    ///
    /// let message = "MSH|^~\\&|APP|FAC\rZNT||ADT^A01||HL7^x||||HOSP:ER";
    /// let znt = ZntFields::extract(message).unwrap();
    /// assert_eq!(znt.message_code.as_deref(), Some("ADT"));
    /// assert_eq!(znt.delivery_type.as_deref(), Some("HL7"));
    /// assert_eq!(znt.facility.as_deref(), Some("ER"));
    /// ```
    pub fn extract(message: &str) -> Option<Self> {
        let separator = MshHeader::parse(message).map_or('|', |msh| msh.separator);
        let znt = segments(message).find(|segment| segment.starts_with("ZNT"))?;
        let fields: Vec<&str> = znt.split(separator).collect();

        let component = |n: usize| {
            fields
                .get(n)
                .and_then(|field| field.split('^').next())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let facility = component(8).map(|raw| match raw.split_once(':') {
            Some((_, code)) => code.to_string(),
            None => raw,
        });

        Some(Self {
            message_code: component(2),
            delivery_type: component(4),
            facility,
        })
    }

    /// Copies the present fields into an interaction's parameter map
    pub fn apply(&self, parameters: &mut BTreeMap<String, String>) {
        let pairs = [
            (MESSAGE_CODE, &self.message_code),
            (DELIVERY_TYPE, &self.delivery_type),
            (FACILITY, &self.facility),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                parameters.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// Derives `SendingApp@SendingFacility` from MSH-3 and MSH-4
pub fn user_agent(message: &str) -> String {
    let Some(msh) = MshHeader::parse(message) else {
        return DEFAULT_USER_AGENT.to_string();
    };

    let app = msh.field(3).trim();
    let facility = msh.field(4).trim();
    match (app.is_empty(), facility.is_empty()) {
        (true, true) => DEFAULT_USER_AGENT.to_string(),
        (true, false) => format!("UnknownApp@{facility}"),
        (false, true) => format!("{app}@UnknownFacility"),
        (false, false) => format!("{app}@{facility}"),
    }
}

/// Builds an `AA` acknowledgement for `message`
///
/// Sender and receiver are swapped, the control id is echoed in MSA-2 and an
/// NTE segment carries the interaction id.
///
/// # Errors
///
/// Returns a validation error when `message` does not start with an MSH
/// segment or lacks a control id.
pub fn build_ack(message: &str, interaction_id: &str) -> Result<String> {
    let msh = MshHeader::parse(message)
        .ok_or_else(|| GatewayError::Validation("HL7 message has no MSH segment".to_string()))?;

    let control_id = msh.field(10);
    if control_id.is_empty() {
        return Err(GatewayError::Validation(
            "HL7 message has no control id (MSH-10)".to_string(),
        ));
    }

    let sep = msh.separator;
    let encoding = msh.field(2);
    let trigger = msh.field(9).split('^').nth(1).unwrap_or("");
    let version = match msh.field(12) {
        "" => "2.3",
        version => version,
    };
    let timestamp = Utc::now().format(HL7_TIMESTAMP_FORMAT).to_string();
    let message_type = format!("ACK^{trigger}^ACK");

    let header = [
        "MSH",
        encoding,
        msh.field(5),
        msh.field(6),
        msh.field(3),
        msh.field(4),
        timestamp.as_str(),
        "",
        message_type.as_str(),
        control_id,
        msh.field(11),
        version,
    ]
    .join(&sep.to_string());

    Ok(format!(
        "{header}\rMSA{sep}AA{sep}{control_id}\rNTE{sep}1{sep}{sep}InteractionID: {interaction_id} \\F\\ NexusIngestVersion: {}\r",
        env!("CARGO_PKG_VERSION")
    ))
}

/// Fixed negative acknowledgement sent when processing fails
pub fn build_nack() -> String {
    let timestamp = Utc::now().format(HL7_TIMESTAMP_FORMAT);
    format!(
        "MSH|^~\\&|MLLP_LISTENER|LOCAL|BRIDGE|REMOTE|{timestamp}||ACK^O01|1|P|2.3\r\
         MSA|AE|1\r\
         NTE|1||Internal error processing message\r"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ADT: &str = "MSH|^~\\&|EPIC|GOODHEALTH|NEXUS|TECHBD|20250101120000||ADT^A01|MSG00001|P|2.5\r\
                       PID|1||12345\r\
                       ZNT||ADT^A01||HL7^Inbound||||HOSP:ER\r";

    #[test]
    fn test_frame_roundtrip_and_end_detection() {
        let framed = wrap_frame(b"MSH|x");
        assert_eq!(framed.first(), Some(&START_BLOCK));
        assert_eq!(&framed[framed.len() - 2..], &[END_BLOCK, CARRIAGE_RETURN]);
        assert_eq!(find_frame_end(&framed), Some(framed.len() - 2));
        assert_eq!(unwrap_frame(&framed), b"MSH|x");
    }

    #[test]
    fn test_incomplete_frame() {
        assert_eq!(find_frame_end(&[START_BLOCK, b'M', b'S']), None);
        assert_eq!(unwrap_frame(&[START_BLOCK, b'M', b'S']), b"MS");
    }

    #[test]
    fn test_unframed_input_passes_through() {
        assert_eq!(unwrap_frame(b"MSH|plain"), b"MSH|plain");
    }

    #[test]
    fn test_znt_extraction() {
        let znt = ZntFields::extract(ADT).unwrap();
        assert_eq!(
            znt,
            ZntFields {
                message_code: Some("ADT".to_string()),
                delivery_type: Some("HL7".to_string()),
                facility: Some("ER".to_string()),
            }
        );

        let mut params = BTreeMap::new();
        znt.apply(&mut params);
        assert_eq!(params.get(FACILITY).map(String::as_str), Some("ER"));
        assert_eq!(params.get(MESSAGE_CODE).map(String::as_str), Some("ADT"));
        assert_eq!(params.get(DELIVERY_TYPE).map(String::as_str), Some("HL7"));
    }

    #[test]
    fn test_znt_missing_and_partial() {
        assert!(ZntFields::extract("MSH|^~\\&|A|B\rPID|1").is_none());

        let znt = ZntFields::extract("MSH|^~\\&|A|B\rZNT||ORU").unwrap();
        assert_eq!(znt.message_code.as_deref(), Some("ORU"));
        assert!(znt.facility.is_none());

        let mut params = BTreeMap::new();
        znt.apply(&mut params);
        assert_eq!(params.len(), 1);
    }

    #[test_case(ADT, "EPIC@GOODHEALTH" ; "both present")]
    #[test_case("MSH|^~\\&||GOODHEALTH|X", "UnknownApp@GOODHEALTH" ; "app missing")]
    #[test_case("MSH|^~\\&|EPIC||X", "EPIC@UnknownFacility" ; "facility missing")]
    #[test_case("MSH|^~\\&|||X", DEFAULT_USER_AGENT ; "both missing")]
    #[test_case("PID|1", DEFAULT_USER_AGENT ; "not hl7")]
    fn test_user_agent(message: &str, expected: &str) {
        assert_eq!(user_agent(message), expected);
    }

    #[test]
    fn test_ack_swaps_sender_and_echoes_control_id() {
        let ack = build_ack(ADT, "int-1").unwrap();
        let lines: Vec<&str> = ack.split('\r').collect();

        let msh: Vec<&str> = lines[0].split('|').collect();
        assert_eq!(&msh[2..6], &["NEXUS", "TECHBD", "EPIC", "GOODHEALTH"]);
        assert_eq!(msh[8], "ACK^A01^ACK");
        assert_eq!(msh[9], "MSG00001");
        assert_eq!(msh[11], "2.5");

        assert_eq!(lines[1], "MSA|AA|MSG00001");
        assert!(lines[2].starts_with("NTE|1||InteractionID: int-1"));
    }

    #[test]
    fn test_ack_rejects_non_hl7() {
        assert!(build_ack("hello", "int-1").is_err());
        assert!(build_ack("MSH|^~\\&|A|B|C|D|||ADT^A01", "int-1").is_err());
    }

    #[test]
    fn test_nack_shape() {
        let nack = build_nack();
        assert!(nack.starts_with("MSH|^~\\&|MLLP_LISTENER|LOCAL|BRIDGE|REMOTE|"));
        assert!(nack.contains("\rMSA|AE|1\r"));
        assert!(nack.ends_with("NTE|1||Internal error processing message\r"));
    }
}
