//! Domain values stored in module options and their config-tree serializers.
//!
//! A [`DomainSerializer`] maps one rich value onto a subtree of the config
//! tree and back, validating on the way in. [`DomainKind`] and [`DomainValue`]
//! form the closed set of domain types an option may hold.

use crate::config::{ConfigNode, ConfigPath, NodeValue};
use crate::error::ConfigError;
use crate::types::{BlockLocation, Color};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bidirectional mapping between a domain value and a config subtree.
pub trait DomainSerializer {
    type Value;

    /// Reads a value from `node`. Errors carry paths relative to `node`.
    fn decode(&self, node: &ConfigNode) -> Result<Self::Value, ConfigError>;

    /// Writes `value` into `node`; `None` clears the node to null.
    fn encode(&self, value: Option<&Self::Value>, node: &mut ConfigNode) -> Result<(), ConfigError>;
}

// ============================================================================
// Waypoint
// ============================================================================

/// A named, located, colored world marker managed on behalf of a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Waypoint {
    pub name: String,
    pub location: BlockLocation,
    pub color: Color,
    /// Prevents the player from deleting the waypoint client-side
    pub prevent_removal: bool,
    pub visible: bool,
}

impl Waypoint {
    /// Creates a white, removable, hidden waypoint.
    pub fn new(name: impl Into<String>, location: BlockLocation) -> Self {
        Self {
            name: name.into(),
            location,
            color: Color::WHITE,
            prevent_removal: false,
            visible: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_prevent_removal(mut self, prevent_removal: bool) -> Self {
        self.prevent_removal = prevent_removal;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

const DEFAULT_COLOR: &str = "#FFFFFF";

/// Config layout:
///
/// ```toml
/// name = "Spawn"
/// color = "#FF0000"
/// prevent-removal = false
/// visible = true
///
/// [location]
/// world = "world"
/// x = 0
/// y = 100
/// z = 0
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WaypointSerializer;

impl WaypointSerializer {
    fn required<'a>(node: &'a ConfigNode, path: &[&str]) -> Result<&'a ConfigNode, ConfigError> {
        node.child(path).ok_or_else(|| ConfigError::MissingField {
            path: ConfigPath::from_segments(path.iter().copied()).to_string(),
        })
    }

    fn required_str<'a>(node: &'a ConfigNode, path: &[&str]) -> Result<&'a str, ConfigError> {
        let child = Self::required(node, path)?;
        child.as_str().ok_or_else(|| mismatch(path, "string", child))
    }

    fn required_coordinate(node: &ConfigNode, path: &[&str]) -> Result<i32, ConfigError> {
        let child = Self::required(node, path)?;
        let value = child.as_int().ok_or_else(|| mismatch(path, "integer", child))?;
        i32::try_from(value).map_err(|_| ConfigError::Invalid {
            path: ConfigPath::from_segments(path.iter().copied()).to_string(),
            reason: format!("{value} does not fit a block coordinate"),
        })
    }

    /// Absent and null both fall back to `false`.
    fn optional_bool(node: &ConfigNode, path: &[&str]) -> Result<bool, ConfigError> {
        match node.child(path) {
            None => Ok(false),
            Some(child) if child.is_null() => Ok(false),
            Some(child) => child.as_bool().ok_or_else(|| mismatch(path, "boolean", child)),
        }
    }
}

fn mismatch(path: &[&str], expected: &'static str, found: &ConfigNode) -> ConfigError {
    ConfigError::TypeMismatch {
        path: ConfigPath::from_segments(path.iter().copied()).to_string(),
        expected,
        found: found.kind_name(),
    }
}

impl DomainSerializer for WaypointSerializer {
    type Value = Waypoint;

    fn decode(&self, node: &ConfigNode) -> Result<Waypoint, ConfigError> {
        let name = Self::required_str(node, &["name"])?;
        if name.is_empty() {
            return Err(ConfigError::Invalid {
                path: "name".to_string(),
                reason: "waypoint name must not be empty".to_string(),
            });
        }

        let location = BlockLocation {
            world: Self::required_str(node, &["location", "world"])?.to_string(),
            x: Self::required_coordinate(node, &["location", "x"])?,
            y: Self::required_coordinate(node, &["location", "y"])?,
            z: Self::required_coordinate(node, &["location", "z"])?,
        };

        let color_text = match node.child(&["color"]) {
            None => DEFAULT_COLOR,
            Some(child) if child.is_null() => DEFAULT_COLOR,
            Some(child) => child
                .as_str()
                .ok_or_else(|| mismatch(&["color"], "string", child))?,
        };
        let color = Color::decode(color_text).map_err(|source| ConfigError::InvalidColor {
            path: "color".to_string(),
            source,
        })?;

        Ok(Waypoint {
            name: name.to_string(),
            location,
            color,
            prevent_removal: Self::optional_bool(node, &["prevent-removal"])?,
            visible: Self::optional_bool(node, &["visible"])?,
        })
    }

    fn encode(&self, value: Option<&Waypoint>, node: &mut ConfigNode) -> Result<(), ConfigError> {
        let Some(waypoint) = value else {
            node.clear();
            return Ok(());
        };

        node.node_mut(&["name"]).set(waypoint.name.as_str());
        node.node_mut(&["location", "world"])
            .set(waypoint.location.world.as_str());
        node.node_mut(&["location", "x"]).set(waypoint.location.x);
        node.node_mut(&["location", "y"]).set(waypoint.location.y);
        node.node_mut(&["location", "z"]).set(waypoint.location.z);
        node.node_mut(&["color"]).set(waypoint.color.to_hex());
        node.node_mut(&["prevent-removal"]).set(waypoint.prevent_removal);
        node.node_mut(&["visible"]).set(waypoint.visible);
        Ok(())
    }
}

// ============================================================================
// Mod setting
// ============================================================================

/// Client-side settings override for one mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModSetting {
    /// Identifier of the mod on the client
    pub target: String,
    pub enable: bool,
    /// Per-setting overrides; `None` leaves the client's values alone
    pub properties: Option<BTreeMap<String, serde_json::Value>>,
}

impl ModSetting {
    /// A disabled setting without property overrides.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            enable: false,
            properties: None,
        }
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Config layout:
///
/// ```toml
/// target = "skyblockAddons"
/// enable = true
///
/// [properties]
/// scale = 2
/// ```
///
/// Property values must be scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModSettingSerializer;

impl ModSettingSerializer {
    fn property(node: &ConfigNode, key: &str) -> Result<serde_json::Value, ConfigError> {
        let mismatch = || ConfigError::TypeMismatch {
            path: format!("properties.{key}"),
            expected: "scalar",
            found: node.kind_name(),
        };

        match node.value() {
            NodeValue::Bool(flag) => Ok(serde_json::Value::Bool(*flag)),
            NodeValue::Int(number) => Ok(serde_json::Value::from(*number)),
            NodeValue::Float(number) => serde_json::Number::from_f64(*number)
                .map(serde_json::Value::Number)
                .ok_or_else(mismatch),
            NodeValue::Str(text) => Ok(serde_json::Value::String(text.clone())),
            _ => Err(mismatch()),
        }
    }
}

impl DomainSerializer for ModSettingSerializer {
    type Value = ModSetting;

    fn decode(&self, node: &ConfigNode) -> Result<ModSetting, ConfigError> {
        let target = node.child(&["target"]).ok_or_else(|| ConfigError::MissingField {
            path: "target".to_string(),
        })?;
        let target = target.as_str().ok_or_else(|| mismatch(&["target"], "string", target))?;
        if target.is_empty() {
            return Err(ConfigError::Invalid {
                path: "target".to_string(),
                reason: "mod setting target must not be empty".to_string(),
            });
        }

        let enable = match node.child(&["enable"]) {
            None => false,
            Some(child) if child.is_null() => false,
            Some(child) => child.as_bool().ok_or_else(|| mismatch(&["enable"], "boolean", child))?,
        };

        let properties = match node.child(&["properties"]) {
            None => None,
            Some(child) if child.is_null() => None,
            Some(child) => {
                let NodeValue::Map(entries) = child.value() else {
                    return Err(mismatch(&["properties"], "table", child));
                };
                let mut properties = BTreeMap::new();
                for (key, value) in entries {
                    if value.is_null() {
                        continue;
                    }
                    properties.insert(key.clone(), Self::property(value, key)?);
                }
                Some(properties)
            }
        };

        Ok(ModSetting {
            target: target.to_string(),
            enable,
            properties,
        })
    }

    fn encode(&self, value: Option<&ModSetting>, node: &mut ConfigNode) -> Result<(), ConfigError> {
        let Some(setting) = value else {
            node.clear();
            return Ok(());
        };

        node.node_mut(&["target"]).set(setting.target.as_str());
        node.node_mut(&["enable"]).set(setting.enable);
        let properties = node.node_mut(&["properties"]);
        let Some(entries) = &setting.properties else {
            properties.clear();
            return Ok(());
        };

        *properties = ConfigNode::table();
        for (key, value) in entries {
            let leaf = properties.node_mut(&[key.as_str()]);
            match value {
                serde_json::Value::Bool(flag) => leaf.set(*flag),
                serde_json::Value::String(text) => leaf.set(text.as_str()),
                serde_json::Value::Number(number) => match number.as_i64() {
                    Some(int) => leaf.set(int),
                    None => leaf.set(number.as_f64().unwrap_or_default()),
                },
                other => {
                    return Err(ConfigError::Invalid {
                        path: format!("properties.{key}"),
                        reason: format!("property value {other} is not a scalar"),
                    })
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Closed domain set
// ============================================================================

/// Every domain type an option may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Waypoint,
    ModSetting,
}

/// A decoded domain value, tagged by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Waypoint(Waypoint),
    ModSetting(ModSetting),
}

impl DomainValue {
    pub fn kind(&self) -> DomainKind {
        match self {
            DomainValue::Waypoint(_) => DomainKind::Waypoint,
            DomainValue::ModSetting(_) => DomainKind::ModSetting,
        }
    }

    /// The value as sent to clients.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            DomainValue::Waypoint(waypoint) => serde_json::to_value(WaypointView {
                name: &waypoint.name,
                location: &waypoint.location,
                color: waypoint.color.argb(),
                prevent_removal: waypoint.prevent_removal,
                visible: waypoint.visible,
            }),
            DomainValue::ModSetting(setting) => serde_json::to_value(setting),
        }
    }
}

#[derive(Serialize)]
struct WaypointView<'a> {
    name: &'a str,
    location: &'a BlockLocation,
    /// ARGB
    color: u32,
    prevent_removal: bool,
    visible: bool,
}

impl DomainKind {
    pub fn name(&self) -> &'static str {
        match self {
            DomainKind::Waypoint => "waypoint",
            DomainKind::ModSetting => "mod setting",
        }
    }

    pub(crate) fn decode(&self, node: &ConfigNode, path: &ConfigPath) -> Result<DomainValue, ConfigError> {
        match self {
            DomainKind::Waypoint => WaypointSerializer
                .decode(node)
                .map(DomainValue::Waypoint)
                .map_err(|error| error.within(path)),
            DomainKind::ModSetting => ModSettingSerializer
                .decode(node)
                .map(DomainValue::ModSetting)
                .map_err(|error| error.within(path)),
        }
    }

    pub(crate) fn encode(
        &self,
        value: &DomainValue,
        node: &mut ConfigNode,
        path: &ConfigPath,
    ) -> Result<(), ConfigError> {
        match (self, value) {
            (DomainKind::Waypoint, DomainValue::Waypoint(waypoint)) => WaypointSerializer
                .encode(Some(waypoint), node)
                .map_err(|error| error.within(path)),
            (DomainKind::ModSetting, DomainValue::ModSetting(setting)) => ModSettingSerializer
                .encode(Some(setting), node)
                .map_err(|error| error.within(path)),
            (kind, value) => Err(ConfigError::TypeMismatch {
                path: path.to_string(),
                expected: kind.name(),
                found: value.kind().name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn() -> Waypoint {
        Waypoint::new("Spawn", BlockLocation::new("world", 0, 100, 0))
            .with_color(Color::RED)
            .with_visible(true)
    }

    fn encoded(waypoint: &Waypoint) -> ConfigNode {
        let mut node = ConfigNode::table();
        WaypointSerializer.encode(Some(waypoint), &mut node).unwrap();
        node
    }

    #[test]
    fn test_round_trip_preserves_waypoint() {
        let waypoint = spawn().with_prevent_removal(true);
        let decoded = WaypointSerializer.decode(&encoded(&waypoint)).unwrap();
        assert_eq!(decoded, waypoint);
    }

    #[test]
    fn test_round_trip_normalizes_alpha() {
        let waypoint = spawn().with_color(Color::from_argb(0x40_11_22_33));
        let node = encoded(&waypoint);
        assert_eq!(node.child(&["color"]).and_then(ConfigNode::as_str), Some("#112233"));

        let decoded = WaypointSerializer.decode(&node).unwrap();
        assert_eq!(decoded.color, Color::from_rgb(0x11_22_33));
        assert_eq!(decoded.color.alpha(), 0xFF);
    }

    #[test]
    fn test_missing_name_is_reported() {
        let mut node = encoded(&spawn());
        node.remove(&["name"]);

        let error = WaypointSerializer.decode(&node).unwrap_err();
        assert!(matches!(&error, ConfigError::MissingField { path } if path == "name"));
    }

    #[test]
    fn test_missing_location_field_names_full_path() {
        let mut node = encoded(&spawn());
        node.remove(&["location", "z"]);

        let error = WaypointSerializer.decode(&node).unwrap_err();
        assert!(matches!(&error, ConfigError::MissingField { path } if path == "location.z"));
    }

    #[test]
    fn test_optional_fields_default() {
        let mut node = encoded(&spawn());
        node.remove(&["color"]);
        node.remove(&["visible"]);
        node.remove(&["prevent-removal"]);

        let decoded = WaypointSerializer.decode(&node).unwrap();
        assert_eq!(decoded.color, Color::WHITE);
        assert!(!decoded.visible);
        assert!(!decoded.prevent_removal);
    }

    #[test]
    fn test_malformed_color_fails() {
        let mut node = encoded(&spawn());
        node.node_mut(&["color"]).set("#ZZZZZZ");

        let error = WaypointSerializer.decode(&node).unwrap_err();
        assert!(matches!(&error, ConfigError::InvalidColor { path, .. } if path == "color"));
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let mut node = encoded(&spawn());
        node.node_mut(&["name"]).set("");
        assert!(matches!(
            WaypointSerializer.decode(&node),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_coordinate_out_of_range() {
        let mut node = encoded(&spawn());
        node.node_mut(&["location", "x"]).set(i64::from(i32::MAX) + 1);
        assert!(matches!(
            WaypointSerializer.decode(&node),
            Err(ConfigError::Invalid { path, .. }) if path == "location.x"
        ));
    }

    #[test]
    fn test_encoding_none_clears_node() {
        let mut node = encoded(&spawn());
        WaypointSerializer.encode(None, &mut node).unwrap();
        assert!(node.is_null());
    }

    fn skyblock() -> ModSetting {
        ModSetting::new("skyblockAddons")
            .with_enable(true)
            .with_property("scale", 2)
            .with_property("label", "Bank")
    }

    #[test]
    fn test_mod_setting_round_trip() {
        let mut node = ConfigNode::table();
        ModSettingSerializer.encode(Some(&skyblock()), &mut node).unwrap();
        assert_eq!(node.child(&["properties", "scale"]).and_then(ConfigNode::as_int), Some(2));
        assert_eq!(ModSettingSerializer.decode(&node).unwrap(), skyblock());
    }

    #[test]
    fn test_mod_setting_without_properties_writes_null() {
        let mut node = ConfigNode::table();
        ModSettingSerializer
            .encode(Some(&ModSetting::new("skyblockAddons")), &mut node)
            .unwrap();
        assert!(node.child(&["properties"]).unwrap().is_null());

        let decoded = ModSettingSerializer.decode(&node).unwrap();
        assert_eq!(decoded.properties, None);
        assert!(!decoded.enable);
    }

    #[test]
    fn test_mod_setting_requires_target() {
        let error = ModSettingSerializer.decode(&ConfigNode::table()).unwrap_err();
        assert!(matches!(&error, ConfigError::MissingField { path } if path == "target"));
    }

    #[test]
    fn test_mod_setting_rejects_nested_property() {
        let mut node = ConfigNode::table();
        node.node_mut(&["target"]).set("skyblockAddons");
        node.node_mut(&["properties", "nested", "deep"]).set(1);
        assert!(matches!(
            ModSettingSerializer.decode(&node),
            Err(ConfigError::TypeMismatch { path, .. }) if path == "properties.nested"
        ));
    }

    #[test]
    fn test_mismatched_domain_value_is_rejected() {
        let mut node = ConfigNode::new();
        let value = DomainValue::ModSetting(skyblock());
        let result = DomainKind::Waypoint.encode(&value, &mut node, &ConfigPath::root());
        assert!(matches!(result, Err(ConfigError::TypeMismatch { found: "mod setting", .. })));
    }

    #[test]
    fn test_domain_errors_are_rerooted() {
        let node = ConfigNode::table();
        let path = ConfigPath::from_segments(["default-waypoints", "0"]);
        let error = DomainKind::Waypoint.decode(&node, &path).unwrap_err();
        assert!(matches!(&error, ConfigError::MissingField { path } if path == "default-waypoints.0.name"));
    }
}
