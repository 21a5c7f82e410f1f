//! Client wire messages.
//!
//! Every outbound update is one immutable [`WireMessage`] variant. A frame is a
//! single kind tag byte followed by the JSON payload of the variant:
//!
//! ```text
//! +-----+---------------------+
//! | tag | JSON payload        |
//! +-----+---------------------+
//! ```
//!
//! Encoding produces an [`EncodedMessage`] whose bytes sit behind an `Arc`, so a
//! broadcast hands every recipient the very same buffer.

use crate::domain::ModSetting;
use crate::error::ProtocolError;
use crate::types::BlockLocation;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Stable tag identifying a message kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    DisplayTitle = 1,
    ResetTitles = 2,
    DisplayWaypoint = 3,
    RemoveWaypoint = 4,
    ResetWaypoints = 5,
    ModSettings = 6,
    ResetModSettings = 7,
    OverrideOptions = 8,
}

impl MessageKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            1 => Ok(MessageKind::DisplayTitle),
            2 => Ok(MessageKind::ResetTitles),
            3 => Ok(MessageKind::DisplayWaypoint),
            4 => Ok(MessageKind::RemoveWaypoint),
            5 => Ok(MessageKind::ResetWaypoints),
            6 => Ok(MessageKind::ModSettings),
            7 => Ok(MessageKind::ResetModSettings),
            8 => Ok(MessageKind::OverrideOptions),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::DisplayTitle => "DisplayTitle",
            MessageKind::ResetTitles => "ResetTitles",
            MessageKind::DisplayWaypoint => "DisplayWaypoint",
            MessageKind::RemoveWaypoint => "RemoveWaypoint",
            MessageKind::ResetWaypoints => "ResetWaypoints",
            MessageKind::ModSettings => "ModSettings",
            MessageKind::ResetModSettings => "ResetModSettings",
            MessageKind::OverrideOptions => "OverrideOptions",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Which title line a [`DisplayTitleMessage`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleType {
    Title,
    Subtitle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTitleMessage {
    pub title_type: TitleType,
    pub message: String,
    pub scale: f32,
    pub fade_in_ms: u64,
    pub display_ms: u64,
    pub fade_out_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetTitlesMessage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayWaypointMessage {
    pub name: String,
    pub location: BlockLocation,
    /// ARGB
    pub color: u32,
    pub prevent_removal: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveWaypointMessage {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetWaypointsMessage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModSettingsMessage {
    pub settings: Vec<ModSetting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetModSettingsMessage;

/// Current values of a module's client-mirrored options, keyed by dotted
/// option path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideOptionsMessage {
    pub module: String,
    pub options: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// Messages
// ============================================================================

/// An outbound client message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    DisplayTitle(DisplayTitleMessage),
    ResetTitles(ResetTitlesMessage),
    DisplayWaypoint(DisplayWaypointMessage),
    RemoveWaypoint(RemoveWaypointMessage),
    ResetWaypoints(ResetWaypointsMessage),
    ModSettings(ModSettingsMessage),
    ResetModSettings(ResetModSettingsMessage),
    OverrideOptions(OverrideOptionsMessage),
}

/// A framed message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    kind: MessageKind,
    bytes: Arc<[u8]>,
}

impl EncodedMessage {
    fn frame(kind: MessageKind, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(kind.tag());
        bytes.extend_from_slice(payload);
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle on the frame; clones of one message share one buffer.
    pub fn shared_bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Payload-free messages are encoded once and shared by every send.
static RESET_TITLES_FRAME: Lazy<EncodedMessage> =
    Lazy::new(|| EncodedMessage::frame(MessageKind::ResetTitles, b"null"));
static RESET_WAYPOINTS_FRAME: Lazy<EncodedMessage> =
    Lazy::new(|| EncodedMessage::frame(MessageKind::ResetWaypoints, b"null"));
static RESET_MOD_SETTINGS_FRAME: Lazy<EncodedMessage> =
    Lazy::new(|| EncodedMessage::frame(MessageKind::ResetModSettings, b"null"));

impl WireMessage {
    pub fn reset_titles() -> Self {
        WireMessage::ResetTitles(ResetTitlesMessage)
    }

    pub fn reset_waypoints() -> Self {
        WireMessage::ResetWaypoints(ResetWaypointsMessage)
    }

    pub fn reset_mod_settings() -> Self {
        WireMessage::ResetModSettings(ResetModSettingsMessage)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            WireMessage::DisplayTitle(_) => MessageKind::DisplayTitle,
            WireMessage::ResetTitles(_) => MessageKind::ResetTitles,
            WireMessage::DisplayWaypoint(_) => MessageKind::DisplayWaypoint,
            WireMessage::RemoveWaypoint(_) => MessageKind::RemoveWaypoint,
            WireMessage::ResetWaypoints(_) => MessageKind::ResetWaypoints,
            WireMessage::ModSettings(_) => MessageKind::ModSettings,
            WireMessage::ResetModSettings(_) => MessageKind::ResetModSettings,
            WireMessage::OverrideOptions(_) => MessageKind::OverrideOptions,
        }
    }

    /// Checks the field-level rules every frame must satisfy.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |reason: &str| ProtocolError::Invalid {
            kind: self.kind().name(),
            reason: reason.to_string(),
        };

        match self {
            WireMessage::DisplayTitle(title) => {
                if !title.scale.is_finite() || title.scale <= 0.0 {
                    return Err(invalid("scale must be a positive finite number"));
                }
            }
            WireMessage::DisplayWaypoint(waypoint) => {
                if waypoint.name.is_empty() {
                    return Err(invalid("waypoint name must not be empty"));
                }
                if waypoint.location.world.is_empty() {
                    return Err(invalid("world must not be empty"));
                }
            }
            WireMessage::RemoveWaypoint(remove) => {
                if remove.name.is_empty() {
                    return Err(invalid("waypoint name must not be empty"));
                }
            }
            WireMessage::ModSettings(message) => {
                if message.settings.iter().any(|setting| setting.target.is_empty()) {
                    return Err(invalid("mod setting target must not be empty"));
                }
            }
            WireMessage::OverrideOptions(message) => {
                if message.module.is_empty() {
                    return Err(invalid("module name must not be empty"));
                }
            }
            WireMessage::ResetTitles(_)
            | WireMessage::ResetWaypoints(_)
            | WireMessage::ResetModSettings(_) => {}
        }
        Ok(())
    }

    /// Validates and frames the message.
    pub fn encode(&self) -> Result<EncodedMessage, ProtocolError> {
        self.validate()?;
        let kind = self.kind();
        let payload = match self {
            WireMessage::DisplayTitle(message) => serde_json::to_vec(message)?,
            WireMessage::DisplayWaypoint(message) => serde_json::to_vec(message)?,
            WireMessage::RemoveWaypoint(message) => serde_json::to_vec(message)?,
            WireMessage::ModSettings(message) => serde_json::to_vec(message)?,
            WireMessage::OverrideOptions(message) => serde_json::to_vec(message)?,
            WireMessage::ResetTitles(_) => return Ok(RESET_TITLES_FRAME.clone()),
            WireMessage::ResetWaypoints(_) => return Ok(RESET_WAYPOINTS_FRAME.clone()),
            WireMessage::ResetModSettings(_) => return Ok(RESET_MOD_SETTINGS_FRAME.clone()),
        };
        Ok(EncodedMessage::frame(kind, &payload))
    }

    /// Parses and validates a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, payload) = frame.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let kind = MessageKind::from_tag(tag)?;

        let message = match kind {
            MessageKind::DisplayTitle => WireMessage::DisplayTitle(parse(payload)?),
            MessageKind::ResetTitles => WireMessage::ResetTitles(parse(payload)?),
            MessageKind::DisplayWaypoint => WireMessage::DisplayWaypoint(parse(payload)?),
            MessageKind::RemoveWaypoint => WireMessage::RemoveWaypoint(parse(payload)?),
            MessageKind::ResetWaypoints => WireMessage::ResetWaypoints(parse(payload)?),
            MessageKind::ModSettings => WireMessage::ModSettings(parse(payload)?),
            MessageKind::ResetModSettings => WireMessage::ResetModSettings(parse(payload)?),
            MessageKind::OverrideOptions => WireMessage::OverrideOptions(parse(payload)?),
        };
        message.validate()?;
        Ok(message)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::Deserialization)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint_message() -> WireMessage {
        WireMessage::DisplayWaypoint(DisplayWaypointMessage {
            name: "Spawn".to_string(),
            location: BlockLocation::new("world", 0, 100, 0),
            color: 0xFFFF_0000,
            prevent_removal: true,
            visible: true,
        })
    }

    #[test]
    fn test_frame_starts_with_kind_tag() {
        let encoded = waypoint_message().encode().unwrap();
        assert_eq!(encoded.kind(), MessageKind::DisplayWaypoint);
        assert_eq!(encoded.bytes()[0], 3);
    }

    #[test]
    fn test_decode_returns_original_message() {
        let message = WireMessage::DisplayTitle(DisplayTitleMessage {
            title_type: TitleType::Subtitle,
            message: "Welcome".to_string(),
            scale: 1.5,
            fade_in_ms: 250,
            display_ms: 3000,
            fade_out_ms: 500,
        });
        let encoded = message.encode().unwrap();
        assert_eq!(WireMessage::decode(encoded.bytes()).unwrap(), message);
        assert_eq!(WireMessage::decode(waypoint_message().encode().unwrap().bytes()).unwrap(), waypoint_message());
    }

    #[test]
    fn test_reset_messages_share_one_frame() {
        let first = WireMessage::reset_waypoints().encode().unwrap();
        let second = WireMessage::reset_waypoints().encode().unwrap();
        assert!(Arc::ptr_eq(first.shared_bytes(), second.shared_bytes()));
        assert_eq!(WireMessage::decode(first.bytes()).unwrap(), WireMessage::reset_waypoints());

        let titles = WireMessage::reset_titles().encode().unwrap();
        assert_eq!(titles.bytes()[0], MessageKind::ResetTitles.tag());
    }

    #[test]
    fn test_mod_settings_and_overrides_decode() {
        let settings = WireMessage::ModSettings(ModSettingsMessage {
            settings: vec![ModSetting::new("skyblockAddons").with_enable(true).with_property("scale", 2)],
        });
        let encoded = settings.encode().unwrap();
        assert_eq!(encoded.bytes()[0], 6);
        assert_eq!(WireMessage::decode(encoded.bytes()).unwrap(), settings);

        let overrides = WireMessage::OverrideOptions(OverrideOptionsMessage {
            module: "Waypoints".to_string(),
            options: BTreeMap::from([("server-handles-waypoints".to_string(), serde_json::Value::Bool(true))]),
        });
        assert_eq!(WireMessage::decode(overrides.encode().unwrap().bytes()).unwrap(), overrides);

        let reset = WireMessage::reset_mod_settings().encode().unwrap();
        assert_eq!(reset.kind(), MessageKind::ResetModSettings);
    }

    #[test]
    fn test_empty_mod_setting_target_is_rejected() {
        let message = WireMessage::ModSettings(ModSettingsMessage {
            settings: vec![ModSetting::new("")],
        });
        assert!(matches!(message.encode(), Err(ProtocolError::Invalid { kind: "ModSettings", .. })));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let message = WireMessage::RemoveWaypoint(RemoveWaypointMessage { name: String::new() });
        assert!(matches!(message.encode(), Err(ProtocolError::Invalid { kind: "RemoveWaypoint", .. })));
    }

    #[test]
    fn test_non_finite_scale_is_rejected() {
        let message = WireMessage::DisplayTitle(DisplayTitleMessage {
            title_type: TitleType::Title,
            message: "Hi".to_string(),
            scale: f32::NAN,
            fade_in_ms: 0,
            display_ms: 0,
            fade_out_ms: 0,
        });
        assert!(message.encode().is_err());
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert!(matches!(WireMessage::decode(&[]), Err(ProtocolError::EmptyFrame)));
        assert!(matches!(WireMessage::decode(&[42, b'{', b'}']), Err(ProtocolError::UnknownTag(42))));
        assert!(matches!(
            WireMessage::decode(&[MessageKind::RemoveWaypoint.tag(), b'{']),
            Err(ProtocolError::Deserialization(_))
        ));

        let mut frame = vec![MessageKind::RemoveWaypoint.tag()];
        frame.extend_from_slice(br#"{"name":""}"#);
        assert!(matches!(WireMessage::decode(&frame), Err(ProtocolError::Invalid { .. })));
    }
}
