//! # Core Type Definitions
//!
//! Fundamental value types shared by the registry, the configuration layer and
//! the wire protocol.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Unique identifier for a connected recipient
//! - [`PlatformKind`] - The kind of host process a module can run on
//! - [`BlockLocation`] - Integer world position used by waypoints
//! - [`Color`] - 32-bit ARGB color with the config-file hex notation

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a player connected to the server.
///
/// This is a wrapper around UUID so player IDs cannot be confused with other
/// identifiers flowing through the delivery layer.
///
/// # Examples
///
/// ```rust
/// use lumen_core::PlayerId;
///
/// let player_id = PlayerId::new();
/// let parsed: PlayerId = player_id.to_string().parse().unwrap();
/// assert_eq!(player_id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of host process the framework is embedded in.
///
/// Modules declare which kinds they support; the registry refuses to enable a
/// module on a platform it does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// A game server hosting players directly.
    Server,
    /// A proxy sitting in front of one or more game servers.
    Proxy,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Server => f.write_str("server"),
            PlatformKind::Proxy => f.write_str("proxy"),
        }
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(PlatformKind::Server),
            "proxy" => Ok(PlatformKind::Proxy),
            other => Err(format!("unknown platform kind: {other}")),
        }
    }
}

// ============================================================================
// World Types
// ============================================================================

/// A block-aligned position inside a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocation {
    /// World identifier
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockLocation {
    /// Creates a new block location.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

// ============================================================================
// Color
// ============================================================================

/// Errors produced when parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{input}': {reason}")]
pub struct ColorParseError {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// A 32-bit ARGB color.
///
/// Config files store colors as `#RRGGBB`; the alpha channel never survives a
/// trip through the config tree, decoded colors are always fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    argb: u32,
}

impl Color {
    pub const WHITE: Color = Color::from_rgb(0xFF_FF_FF);
    pub const BLACK: Color = Color::from_rgb(0x00_00_00);
    pub const RED: Color = Color::from_rgb(0xFF_00_00);

    /// Creates an opaque color from the low 24 bits of `rgb`.
    pub const fn from_rgb(rgb: u32) -> Self {
        Self {
            argb: 0xFF00_0000 | (rgb & 0x00FF_FFFF),
        }
    }

    /// Creates a color carrying an explicit alpha channel.
    pub const fn from_argb(argb: u32) -> Self {
        Self { argb }
    }

    pub const fn argb(&self) -> u32 {
        self.argb
    }

    pub const fn rgb(&self) -> u32 {
        self.argb & 0x00FF_FFFF
    }

    pub const fn alpha(&self) -> u8 {
        (self.argb >> 24) as u8
    }

    /// Returns the same color with the alpha channel forced to opaque.
    pub const fn opaque(&self) -> Self {
        Self::from_rgb(self.rgb())
    }

    /// Renders the color as `#RRGGBB` (uppercase), dropping the alpha channel.
    pub fn to_hex(&self) -> String {
        format!("#{:06X}", self.rgb())
    }

    /// Parses a color using integer-literal notation.
    ///
    /// Accepts `#RRGGBB`, `0xRRGGBB`/`0XRRGGBB`, a `0`-prefixed octal literal or
    /// a plain decimal number, optionally signed. Surrounding whitespace is
    /// rejected. The value must fit in a signed 32-bit integer; only its low
    /// 24 bits are kept and the result is opaque.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lumen_core::Color;
    ///
    /// assert_eq!(Color::decode("#FF0000").unwrap(), Color::RED);
    /// assert_eq!(Color::decode("16777215").unwrap(), Color::WHITE);
    /// assert!(Color::decode("#GG0000").is_err());
    /// ```
    pub fn decode(input: &str) -> Result<Self, ColorParseError> {
        let error = |reason| ColorParseError {
            input: input.to_string(),
            reason,
        };

        let (negative, body) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let (radix, digits) = if let Some(hex) = body
            .strip_prefix("0x")
            .or_else(|| body.strip_prefix("0X"))
            .or_else(|| body.strip_prefix('#'))
        {
            (16, hex)
        } else if body.len() > 1 && body.starts_with('0') {
            (8, &body[1..])
        } else {
            (10, body)
        };

        if digits.is_empty() {
            return Err(error("missing digits"));
        }
        if digits.starts_with(['+', '-']) {
            return Err(error("sign in unexpected position"));
        }

        let magnitude =
            i64::from_str_radix(digits, radix).map_err(|_| error("not a valid number"))?;
        let value = if negative { -magnitude } else { magnitude };
        if value < i64::from(i32::MIN) || value > i64::from(i32::MAX) {
            return Err(error("out of 32-bit range"));
        }

        Ok(Self::from_rgb(value as u32))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
