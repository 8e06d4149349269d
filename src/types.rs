use crate::error::{DynaudioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of attenuation steps between silence and full volume
pub const MAX_VOLUME: u8 = 31;

/// Display name used when none is configured
pub const DEFAULT_NAME: &str = "Dynaudio";

/// TCP port the Connect hub listens on
pub const DEFAULT_PORT: u16 = 1901;

/// Zone targeted when none is configured
pub const DEFAULT_ZONE: &str = "1";

/// Input source selectable on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Minijack,
    Line,
    Optical,
    Coax,
    #[serde(rename = "USB")]
    Usb,
    Bluetooth,
    Stream,
}

/// Every source in protocol order (codes 1 through 7)
pub const SOURCES: [Source; 7] = [
    Source::Minijack,
    Source::Line,
    Source::Optical,
    Source::Coax,
    Source::Usb,
    Source::Bluetooth,
    Source::Stream,
];

impl Source {
    /// Protocol code for this source
    pub const fn code(self) -> u8 {
        match self {
            Self::Minijack => 1,
            Self::Line => 2,
            Self::Optical => 3,
            Self::Coax => 4,
            Self::Usb => 5,
            Self::Bluetooth => 6,
            Self::Stream => 7,
        }
    }

    /// Name shown to users and accepted by [`Source::from_str`]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Minijack => "Minijack",
            Self::Line => "Line",
            Self::Optical => "Optical",
            Self::Coax => "Coax",
            Self::Usb => "USB",
            Self::Bluetooth => "Bluetooth",
            Self::Stream => "Stream",
        }
    }

    /// Source names in protocol order
    pub fn names() -> Vec<String> {
        SOURCES.iter().map(|s| s.name().to_string()).collect()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = DynaudioError;

    fn from_str(name: &str) -> Result<Self> {
        SOURCES
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| DynaudioError::UnknownSource(name.to_string()))
    }
}

impl TryFrom<u8> for Source {
    type Error = DynaudioError;

    fn try_from(code: u8) -> Result<Self> {
        SOURCES
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or(DynaudioError::UnknownSourceCode(code))
    }
}

/// Power state as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Output zone that commands are addressed to
///
/// The protocol packs the zone into the low nibble of a byte (`F1`, `51`),
/// so a zone is always a single hex digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Zone(String);

impl Zone {
    /// Validate a zone identifier
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let mut chars = id.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_hexdigit() => Ok(Self(c.to_ascii_uppercase().to_string())),
            _ => Err(DynaudioError::InvalidZone(id)),
        }
    }

    /// Zone reported by the device as a raw byte
    pub fn from_byte(byte: u8) -> Result<Self> {
        if byte <= 0x0F {
            Ok(Self(format!("{:X}", byte)))
        } else {
            Err(DynaudioError::InvalidZone(format!("{:#04x}", byte)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self(DEFAULT_ZONE.to_string())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Zone {
    type Error = DynaudioError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.0
    }
}

/// Capabilities a host can offer for this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    VolumeSet,
    VolumeMute,
    TurnOn,
    TurnOff,
    SelectSource,
}

/// Everything the device supports through this client
pub const SUPPORTED_FEATURES: [Feature; 5] = [
    Feature::VolumeSet,
    Feature::VolumeMute,
    Feature::TurnOn,
    Feature::TurnOff,
    Feature::SelectSource,
];

/// Device state snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub power: bool,

    /// Attenuation steps in `0..=MAX_VOLUME`
    pub volume: u8,

    pub muted: bool,

    // None until the device has reported a source
    pub source: Option<Source>,

    pub zone: Zone,

    /// Whether the last refresh got any bytes back
    pub responding: bool,
}

impl DeviceState {
    /// Initial state for a zone, before the device has been heard from
    pub fn new(zone: Zone) -> Self {
        Self {
            power: false,
            volume: 0,
            muted: false,
            source: None,
            zone,
            responding: false,
        }
    }

    pub fn power_state(&self) -> PowerState {
        self.power.into()
    }

    /// Volume normalized to `0.0..=1.0`
    pub fn volume_level(&self) -> f64 {
        f64::from(self.volume.min(MAX_VOLUME)) / f64::from(MAX_VOLUME)
    }

    /// Current source name, empty if unknown
    pub fn source_name(&self) -> String {
        self.source.map(|s| s.name().to_string()).unwrap_or_default()
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(Zone::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_table_is_bidirectional() {
        for (i, source) in SOURCES.iter().enumerate() {
            assert_eq!(source.code() as usize, i + 1);
            assert_eq!(Source::try_from(source.code()).unwrap(), *source);
            assert_eq!(source.name().parse::<Source>().unwrap(), *source);
        }
    }

    #[test]
    fn source_names_keep_declared_order() {
        assert_eq!(
            Source::names(),
            vec!["Minijack", "Line", "Optical", "Coax", "USB", "Bluetooth", "Stream"]
        );
    }

    #[test]
    fn unknown_source_lookups_fail() {
        assert!(matches!(
            "Vinyl".parse::<Source>(),
            Err(DynaudioError::UnknownSource(name)) if name == "Vinyl"
        ));
        assert!(matches!("usb".parse::<Source>(), Err(DynaudioError::UnknownSource(_))));
        assert!(matches!(Source::try_from(0), Err(DynaudioError::UnknownSourceCode(0))));
        assert!(matches!(Source::try_from(8), Err(DynaudioError::UnknownSourceCode(8))));
    }

    #[test]
    fn zone_must_be_single_hex_digit() {
        assert_eq!(Zone::new("1").unwrap().as_str(), "1");
        assert_eq!(Zone::new("b").unwrap().as_str(), "B");
        assert!(matches!(Zone::new(""), Err(DynaudioError::InvalidZone(_))));
        assert!(matches!(Zone::new("12"), Err(DynaudioError::InvalidZone(_))));
        assert!(matches!(Zone::new("G"), Err(DynaudioError::InvalidZone(_))));
    }

    #[test]
    fn zone_from_byte() {
        assert_eq!(Zone::from_byte(2).unwrap().as_str(), "2");
        assert_eq!(Zone::from_byte(0x0F).unwrap().as_str(), "F");
        assert!(Zone::from_byte(0x10).is_err());
    }

    #[test]
    fn default_state_is_conservative() {
        let state = DeviceState::default();
        assert_eq!(state.power_state(), PowerState::Off);
        assert_eq!(state.volume_level(), 0.0);
        assert!(!state.muted);
        assert_eq!(state.source_name(), "");
        assert_eq!(state.zone.as_str(), "1");
        assert!(!state.responding);
    }

    #[test]
    fn volume_level_is_normalized() {
        let mut state = DeviceState::default();
        state.volume = MAX_VOLUME;
        assert_eq!(state.volume_level(), 1.0);
        state.volume = 200;
        assert_eq!(state.volume_level(), 1.0);
    }

    #[test]
    fn state_serializes_with_source_names() {
        let mut state = DeviceState::default();
        state.source = Some(Source::Usb);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["source"], "USB");
        assert_eq!(json["zone"], "1");
    }
}
