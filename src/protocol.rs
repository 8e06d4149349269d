use crate::error::{DynaudioError, Result};
use crate::types::{Source, Zone, MAX_VOLUME};
use std::fmt;

/// Two bytes that open every frame
pub const PREFIX: [u8; 2] = [0xFF, 0x55];

/// The length field holds two decimal digits
pub const MAX_PAYLOAD_GROUPS: usize = 99;

/// Bytes before the payload: prefix + length
pub const HEADER_SIZE: usize = 3;

/// Payload of the feedback probe.
///
/// There is no documented query opcode. Sending a mute-style command to zone
/// 2 (assumed idle) makes the hub answer with its current state, so this is
/// used as the query. Protocol workaround, not a real request/response pair.
pub const FEEDBACK_PROBE: [u8; 5] = [0x2F, 0xA0, 0x12, 0x00, 0x72];

/// Smallest response that carries every state field
pub const STATE_REPORT_LEN: usize = 11;

/// Parse one payload group; it must be exactly two hex digits
pub fn parse_group(group: &str) -> Result<u8> {
    let malformed = || DynaudioError::MalformedPayload {
        group: group.to_string(),
    };

    if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    u8::from_str_radix(group, 16).map_err(|_| malformed())
}

/// Parse a whole payload of two-digit hex groups
pub fn parse_payload<S: AsRef<str>>(groups: &[S]) -> Result<Vec<u8>> {
    groups.iter().map(|g| parse_group(g.as_ref())).collect()
}

/// Checksum expected by the device firmware.
///
/// With `S` the byte sum and `n` the byte count, `x = ceil(S / 255)` and the
/// checksum is `(x * 255 - S - (n - x)) mod 256`. Not a standard checksum;
/// it has to match bit for bit.
pub fn compute_checksum(payload: &[u8]) -> u8 {
    let sum: i64 = payload.iter().map(|&b| i64::from(b)).sum();
    let n = payload.len() as i64;
    let x = (sum + 254) / 255;
    (x * 255 - sum - (n - x)).rem_euclid(256) as u8
}

// The group count is written as two decimal digits and then read as hex,
// so 5 becomes 0x05 and 12 becomes 0x12.
fn length_byte(groups: usize) -> u8 {
    ((groups / 10) * 16 + groups % 10) as u8
}

fn group_count(byte: u8) -> Option<usize> {
    let (tens, ones) = (byte >> 4, byte & 0x0F);
    (tens <= 9 && ones <= 9).then(|| usize::from(tens) * 10 + usize::from(ones))
}

/// Upper-case, space separated hex text of some bytes
pub fn hex_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outgoing command frame
///
/// Wire format:
/// ```text
/// ┌───────────┬──────────┬───────────────┬──────────┐
/// │ Prefix    │ Length   │ Payload       │ Checksum │
/// │ 0xFF 0x55 │ (1B)     │ (Length B)    │ (1B)     │
/// └───────────┴──────────┴───────────────┴──────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame around raw payload bytes
    pub fn new(payload: Vec<u8>) -> Result<Self> {
        if payload.is_empty() {
            return Err(DynaudioError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_GROUPS {
            return Err(DynaudioError::PayloadTooLong {
                groups: payload.len(),
            });
        }
        Ok(Self { payload })
    }

    /// The frame sent by `refresh` to provoke a state report
    pub fn feedback_probe() -> Self {
        Self {
            payload: FEEDBACK_PROBE.to_vec(),
        }
    }

    /// Create a frame from textual payload groups such as `["2F", "A0"]`
    pub fn from_groups<S: AsRef<str>>(groups: &[S]) -> Result<Self> {
        Self::new(parse_payload(groups)?)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum(&self) -> u8 {
        compute_checksum(&self.payload)
    }

    /// Encode into the bytes sent on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len() + 1);
        bytes.extend_from_slice(&PREFIX);
        bytes.push(length_byte(self.payload.len()));
        bytes.extend_from_slice(&self.payload);
        bytes.push(self.checksum());
        bytes
    }

    /// Parse a frame received from the wire.
    ///
    /// The trailing checksum is returned as received and is not verified.
    pub fn parse(bytes: &[u8]) -> Result<ReceivedFrame> {
        if bytes.len() < HEADER_SIZE + 2 {
            return Err(DynaudioError::InvalidFrame(format!(
                "expected at least {} bytes, got {}",
                HEADER_SIZE + 2,
                bytes.len()
            )));
        }
        if bytes[..2] != PREFIX {
            return Err(DynaudioError::InvalidFrame(format!(
                "bad prefix {}",
                hex_text(&bytes[..2])
            )));
        }

        let groups = group_count(bytes[2]).ok_or_else(|| {
            DynaudioError::InvalidFrame(format!("bad length byte {:#04x}", bytes[2]))
        })?;
        let expected = HEADER_SIZE + groups + 1;
        if bytes.len() != expected {
            return Err(DynaudioError::InvalidFrame(format!(
                "length says {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }

        Ok(ReceivedFrame {
            frame: Self::new(bytes[HEADER_SIZE..expected - 1].to_vec())?,
            checksum: bytes[expected - 1],
        })
    }
}

impl fmt::Display for Frame {
    /// Text form, e.g. `FF 55 05 2F A0 12 00 72 a8`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02} {} {:02x}",
            hex_text(&PREFIX),
            self.payload.len(),
            hex_text(&self.payload),
            self.checksum()
        )
    }
}

/// A frame parsed from received bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: Frame,
    /// Checksum byte as it appeared on the wire
    pub checksum: u8,
}

impl ReceivedFrame {
    pub fn checksum_matches(&self) -> bool {
        self.checksum == self.frame.checksum()
    }
}

/// State fields read from fixed offsets of a probe response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateReport {
    pub power: bool,
    pub volume: u8,
    pub source_code: u8,
    pub zone: u8,
    pub muted: bool,
}

impl StateReport {
    /// Decode a probe response. Only the length is checked; the response
    /// checksum is not verified.
    pub fn decode(response: &[u8]) -> Result<Self> {
        if response.len() < STATE_REPORT_LEN {
            return Err(DynaudioError::InvalidFrame(format!(
                "state report needs {} bytes, got {}",
                STATE_REPORT_LEN,
                response.len()
            )));
        }

        Ok(Self {
            power: response[6] != 0,
            volume: response[7],
            source_code: response[8],
            zone: response[9],
            muted: response[10] != 0,
        })
    }
}

/// Convert a `0.0..=1.0` volume level into attenuation steps.
///
/// Halfway cases round to even, so 0.5 maps to step 16.
pub fn volume_steps(level: f64) -> Result<u8> {
    if !level.is_finite() {
        return Err(DynaudioError::InvalidVolume(level));
    }
    let steps = (level.clamp(0.0, 1.0) * f64::from(MAX_VOLUME)).round_ties_even();
    Ok(steps as u8)
}

/// High-level intent sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
    /// Volume in attenuation steps
    SetVolume(u8),
    /// The device receives the same bytes for mute and unmute
    Mute(bool),
    SelectSource(Source),
}

impl Command {
    /// Payload groups for this command addressed to `zone`
    pub fn payload(&self, zone: &Zone) -> Vec<String> {
        let groups = |op: &str, arg: String, target: String| {
            vec!["2F".to_string(), "A0".to_string(), op.to_string(), arg, target]
        };

        match self {
            Self::TurnOn => groups("01", "00".to_string(), format!("F{}", zone)),
            Self::TurnOff => groups("02", "01".to_string(), format!("F{}", zone)),
            Self::SetVolume(steps) => groups("13", format!("{:02x}", steps), format!("5{}", zone)),
            Self::Mute(_) => groups("12", "01".to_string(), format!("5{}", zone)),
            Self::SelectSource(source) => {
                groups("15", format!("{:02X}", source.code()), format!("5{}", zone))
            }
        }
    }

    /// Encode this command into a frame for `zone`
    pub fn frame(&self, zone: &Zone) -> Result<Frame> {
        Frame::from_groups(&self.payload(zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str) -> Zone {
        Zone::new(id).unwrap()
    }

    #[test]
    fn checksum_of_probe_payload() {
        assert_eq!(compute_checksum(&[0x2F, 0xA0, 0x12, 0x00, 0x72]), 0xA8);
    }

    #[test]
    fn probe_frame_matches_known_bytes() {
        let frame = Frame::feedback_probe();
        assert_eq!(frame, Frame::from_groups(&["2F", "A0", "12", "00", "72"]).unwrap());
        assert_eq!(
            frame.to_bytes(),
            vec![0xFF, 0x55, 0x05, 0x2F, 0xA0, 0x12, 0x00, 0x72, 0xA8]
        );
        assert_eq!(frame.to_string(), "FF 55 05 2F A0 12 00 72 a8");
    }

    #[test]
    fn checksum_reconstructs_multiple_of_255() {
        let payloads: [&[u8]; 5] = [
            &[0x2F, 0xA0, 0x01, 0x00, 0xF1],
            &[0xFF, 0xFF, 0xFF],
            &[0x01],
            &[0xFF],
            &[0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0, 0xB0],
        ];
        for payload in payloads {
            let sum: i64 = payload.iter().map(|&b| i64::from(b)).sum();
            let n = payload.len() as i64;
            let x = (sum + 254) / 255;
            let checksum = i64::from(compute_checksum(payload));
            assert_eq!((sum + checksum + (n - x)).rem_euclid(256), (x * 255).rem_euclid(256));
        }
    }

    #[test]
    fn checksum_of_all_zero_payload_wraps() {
        // S = 0 gives x = 0, so the checksum is -n mod 256
        assert_eq!(compute_checksum(&[0x00]), 0xFF);
        assert_eq!(compute_checksum(&[0x00, 0x00, 0x00]), 0xFD);
    }

    #[test]
    fn small_checksum_is_zero_padded() {
        let frame = Frame::new(vec![0x05]).unwrap();
        // S = 5, x = 1: 255 - 5 - 0 = 250
        assert_eq!(frame.checksum(), 0xFA);

        let frame = Frame::new(vec![0xFF, 0xF6]).unwrap();
        // S = 501, x = 2: 510 - 501 - 0 = 9
        assert_eq!(frame.checksum(), 0x09);
        assert!(frame.to_string().ends_with(" 09"));
    }

    #[test]
    fn length_field_is_decimal_read_as_hex() {
        let frame = Frame::new(vec![0x01; 12]).unwrap();
        assert_eq!(frame.to_bytes()[2], 0x12);
        assert!(frame.to_string().starts_with("FF 55 12 "));
    }

    #[test]
    fn parse_round_trips_payload() {
        let groups = ["2F", "A0", "13", "10", "51"];
        let frame = Frame::from_groups(&groups).unwrap();
        let received = Frame::parse(&frame.to_bytes()).unwrap();
        assert_eq!(hex_text(received.frame.payload()), groups.join(" "));
        assert!(received.checksum_matches());

        let long = Frame::new((1..=23).collect()).unwrap();
        assert_eq!(Frame::parse(&long.to_bytes()).unwrap().frame, long);
    }

    #[test]
    fn parse_does_not_reject_bad_checksum() {
        let received = Frame::parse(&[0xFF, 0x55, 0x01, 0x05, 0x00]).unwrap();
        assert_eq!(received.frame.payload(), &[0x05]);
        assert!(!received.checksum_matches());
    }

    #[test]
    fn parse_rejects_broken_frames() {
        assert!(matches!(Frame::parse(&[0xFF, 0x55]), Err(DynaudioError::InvalidFrame(_))));
        assert!(matches!(
            Frame::parse(&[0xAA, 0x55, 0x01, 0x05, 0xFA]),
            Err(DynaudioError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::parse(&[0xFF, 0x55, 0x0A, 0x05, 0xFA]),
            Err(DynaudioError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::parse(&[0xFF, 0x55, 0x02, 0x05, 0xFA]),
            Err(DynaudioError::InvalidFrame(_))
        ));
    }

    #[test]
    fn malformed_groups_are_rejected() {
        for bad in ["ZZ", "F12", "1", "", "0x"] {
            assert!(
                matches!(
                    Frame::from_groups(&["2F", bad]),
                    Err(DynaudioError::MalformedPayload { ref group }) if group == bad
                ),
                "group {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn empty_and_oversized_payloads_are_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(Frame::from_groups(&empty), Err(DynaudioError::EmptyPayload)));
        assert!(matches!(
            Frame::new(vec![0; 100]),
            Err(DynaudioError::PayloadTooLong { groups: 100 })
        ));
        assert!(Frame::new(vec![0; 99]).is_ok());
    }

    #[test]
    fn power_payloads() {
        assert_eq!(Command::TurnOn.payload(&zone("1")), ["2F", "A0", "01", "00", "F1"]);
        assert_eq!(Command::TurnOff.payload(&zone("3")), ["2F", "A0", "02", "01", "F3"]);
    }

    #[test]
    fn volume_half_encodes_step_16() {
        let steps = volume_steps(0.5).unwrap();
        assert_eq!(steps, 16);
        assert_eq!(
            Command::SetVolume(steps).payload(&zone("1")),
            ["2F", "A0", "13", "10", "51"]
        );
    }

    #[test]
    fn volume_rounds_and_clamps() {
        assert_eq!(volume_steps(0.25).unwrap(), 8);
        assert_eq!(volume_steps(0.0).unwrap(), 0);
        assert_eq!(volume_steps(1.0).unwrap(), 31);
        assert_eq!(volume_steps(1.7).unwrap(), 31);
        assert_eq!(volume_steps(-0.2).unwrap(), 0);
        assert!(matches!(volume_steps(f64::NAN), Err(DynaudioError::InvalidVolume(_))));
    }

    #[test]
    fn select_bluetooth_uses_code_6() {
        let payload = Command::SelectSource(Source::Bluetooth).payload(&zone("1"));
        assert_eq!(payload, ["2F", "A0", "15", "06", "51"]);
    }

    #[test]
    fn mute_payload_ignores_argument() {
        assert_eq!(
            Command::Mute(true).payload(&zone("1")),
            Command::Mute(false).payload(&zone("1"))
        );
        assert_eq!(Command::Mute(true).payload(&zone("1")), ["2F", "A0", "12", "01", "51"]);
    }

    #[test]
    fn command_frames_encode_zone() {
        let frame = Command::TurnOn.frame(&zone("2")).unwrap();
        assert_eq!(frame.to_bytes()[..8], [0xFF, 0x55, 0x05, 0x2F, 0xA0, 0x01, 0x00, 0xF2]);
    }

    #[test]
    fn state_report_reads_fixed_offsets() {
        let response = [0xFF, 0x55, 0x08, 0x2F, 0xA0, 0x12, 0x01, 0x14, 0x03, 0x01, 0x00, 0x9C];
        let report = StateReport::decode(&response).unwrap();
        assert_eq!(
            report,
            StateReport {
                power: true,
                volume: 0x14,
                source_code: 3,
                zone: 1,
                muted: false,
            }
        );
    }

    #[test]
    fn short_state_report_is_rejected() {
        assert!(matches!(
            StateReport::decode(&[0xFF, 0x55, 0x01]),
            Err(DynaudioError::InvalidFrame(_))
        ));
    }
}
