//! Hierarchical configuration tree.
//!
//! [`ConfigNode`] is the store the synchronizer reads from and writes to. Nodes
//! are addressed by sequences of path segments. A path that does not resolve is
//! *virtual*: [`ConfigNode::child`] returns `None` without creating anything,
//! while [`ConfigNode::node_mut`] materializes the missing segments. An
//! explicit [`NodeValue::Null`] is a present node and is not the same thing as
//! an absent one.
//!
//! Trees are persisted as TOML. TOML has no null, so null nodes are omitted
//! when a tree is rendered. Comments attached to nodes are rendered as `#`
//! lines; they are not read back.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use toml_edit::{Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table, Value};
use tracing::{debug, info};

/// A sequence of path segments, displayed dot-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    /// The empty path addressing a tree root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns a new path with all of `other`'s segments appended.
    pub fn join(&self, other: &ConfigPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

/// The value held by a single node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeValue {
    /// Present but empty
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigNode>),
    Map(BTreeMap<String, ConfigNode>),
}

impl NodeValue {
    /// Human-readable name of the variant, used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeValue::Null => "null",
            NodeValue::Bool(_) => "boolean",
            NodeValue::Int(_) => "integer",
            NodeValue::Float(_) => "float",
            NodeValue::Str(_) => "string",
            NodeValue::List(_) => "list",
            NodeValue::Map(_) => "table",
        }
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        NodeValue::Bool(value)
    }
}

impl From<i64> for NodeValue {
    fn from(value: i64) -> Self {
        NodeValue::Int(value)
    }
}

impl From<i32> for NodeValue {
    fn from(value: i32) -> Self {
        NodeValue::Int(i64::from(value))
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        NodeValue::Float(value)
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        NodeValue::Str(value.to_string())
    }
}

impl From<String> for NodeValue {
    fn from(value: String) -> Self {
        NodeValue::Str(value)
    }
}

impl From<Vec<ConfigNode>> for NodeValue {
    fn from(value: Vec<ConfigNode>) -> Self {
        NodeValue::List(value)
    }
}

/// A node of the configuration tree with an optional human comment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigNode {
    value: NodeValue,
    comment: Option<String>,
}

impl ConfigNode {
    /// Creates a null node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table node, the usual root of a document.
    pub fn table() -> Self {
        Self {
            value: NodeValue::Map(BTreeMap::new()),
            comment: None,
        }
    }

    /// Creates a node holding `value`.
    pub fn with_value(value: impl Into<NodeValue>) -> Self {
        Self {
            value: value.into(),
            comment: None,
        }
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, NodeValue::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        self.value.kind_name()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Returns whether `path` resolves to a node, null or not.
    pub fn has_child<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.child(path).is_some()
    }

    /// Resolves `path` without materializing anything.
    pub fn child<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigNode> {
        path.iter().try_fold(self, |node, segment| match &node.value {
            NodeValue::Map(children) => children.get(segment.as_ref()),
            _ => None,
        })
    }

    /// Resolves `path`, creating every missing segment.
    ///
    /// A non-table node on the way is replaced by an empty table.
    pub fn node_mut<S: AsRef<str>>(&mut self, path: &[S]) -> &mut ConfigNode {
        let mut node = self;
        for segment in path {
            node = node
                .children_mut()
                .entry(segment.as_ref().to_string())
                .or_default();
        }
        node
    }

    /// Detaches the node at `path`, returning it when it existed.
    pub fn remove<S: AsRef<str>>(&mut self, path: &[S]) -> Option<ConfigNode> {
        let (last, parents) = path.split_last()?;
        let mut node = self;
        for segment in parents {
            node = match &mut node.value {
                NodeValue::Map(children) => children.get_mut(segment.as_ref())?,
                _ => return None,
            };
        }
        match &mut node.value {
            NodeValue::Map(children) => children.remove(last.as_ref()),
            _ => None,
        }
    }

    pub fn set(&mut self, value: impl Into<NodeValue>) {
        self.value = value.into();
    }

    /// Explicitly clears the node to null, discarding any children.
    pub fn clear(&mut self) {
        self.value = NodeValue::Null;
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            NodeValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigNode]> {
        match &self.value {
            NodeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Names of the direct children of a table node.
    pub fn keys(&self) -> Vec<&str> {
        match &self.value {
            NodeValue::Map(children) => children.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn children_mut(&mut self) -> &mut BTreeMap<String, ConfigNode> {
        if !matches!(self.value, NodeValue::Map(_)) {
            self.value = NodeValue::Map(BTreeMap::new());
        }
        match &mut self.value {
            NodeValue::Map(children) => children,
            _ => unreachable!("node was converted to a table above"),
        }
    }

    // ========================================================================
    // TOML persistence
    // ========================================================================

    /// Parses a TOML document into a tree.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(Self::from_toml(toml::Value::Table(table)))
    }

    /// Renders the tree as a TOML document.
    ///
    /// Null nodes are left out and node comments are written as `#` lines
    /// above the entry they belong to. The root must be a table (or null,
    /// which renders as an empty document).
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let children = match &self.value {
            NodeValue::Null => return Ok(String::new()),
            NodeValue::Map(children) => children,
            _ => {
                return Err(ConfigError::Invalid {
                    path: ConfigPath::root().to_string(),
                    reason: format!("root node must be a table, found {}", self.kind_name()),
                })
            }
        };

        let mut document = DocumentMut::new();
        Self::fill_table(document.as_table_mut(), children);
        Ok(document.to_string())
    }

    /// Loads a TOML file; a missing file yields an empty table.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} does not exist, starting empty", path.display());
            return Ok(Self::table());
        }

        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    /// Writes the tree to `path` as TOML.
    pub async fn save_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        tokio::fs::write(path, content).await?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    fn from_toml(value: toml::Value) -> Self {
        let value = match value {
            toml::Value::String(text) => NodeValue::Str(text),
            toml::Value::Integer(number) => NodeValue::Int(number),
            toml::Value::Float(number) => NodeValue::Float(number),
            toml::Value::Boolean(flag) => NodeValue::Bool(flag),
            toml::Value::Datetime(datetime) => NodeValue::Str(datetime.to_string()),
            toml::Value::Array(items) => {
                NodeValue::List(items.into_iter().map(Self::from_toml).collect())
            }
            toml::Value::Table(table) => NodeValue::Map(
                table
                    .into_iter()
                    .map(|(key, child)| (key, Self::from_toml(child)))
                    .collect(),
            ),
        };
        Self {
            value,
            comment: None,
        }
    }

    fn fill_table(table: &mut Table, children: &BTreeMap<String, ConfigNode>) {
        for (key, child) in children {
            let Some(mut item) = child.to_item() else {
                continue;
            };

            let comment = child.comment().map(comment_lines);
            if let Some(comment) = &comment {
                match &mut item {
                    Item::Table(nested) => {
                        nested.set_implicit(false);
                        nested.decor_mut().set_prefix(format!("\n{comment}"));
                    }
                    Item::ArrayOfTables(tables) => {
                        if let Some(first) = tables.get_mut(0) {
                            first.decor_mut().set_prefix(format!("\n{comment}"));
                        }
                    }
                    _ => {}
                }
            }

            let is_value = item.is_value();
            table.insert(key, item);
            if let (Some(comment), true) = (comment, is_value) {
                if let Some(mut entry) = table.key_mut(key) {
                    entry.leaf_decor_mut().set_prefix(comment);
                }
            }
        }
    }

    fn to_item(&self) -> Option<Item> {
        match &self.value {
            NodeValue::Map(children) => {
                let mut table = Table::new();
                table.set_implicit(!children.is_empty());
                Self::fill_table(&mut table, children);
                Some(Item::Table(table))
            }
            NodeValue::List(items)
                if !items.is_empty()
                    && items.iter().all(|item| matches!(item.value, NodeValue::Map(_))) =>
            {
                let tables = items
                    .iter()
                    .map(|item| {
                        let mut table = Table::new();
                        if let NodeValue::Map(children) = &item.value {
                            Self::fill_table(&mut table, children);
                        }
                        table
                    })
                    .collect::<ArrayOfTables>();
                Some(Item::ArrayOfTables(tables))
            }
            _ => self.to_value().map(Item::Value),
        }
    }

    fn to_value(&self) -> Option<Value> {
        match &self.value {
            NodeValue::Null => None,
            NodeValue::Bool(flag) => Some(Value::from(*flag)),
            NodeValue::Int(number) => Some(Value::from(*number)),
            NodeValue::Float(number) => Some(Value::from(*number)),
            NodeValue::Str(text) => Some(Value::from(text.as_str())),
            NodeValue::List(items) => Some(Value::Array(
                items.iter().filter_map(Self::to_value).collect::<Array>(),
            )),
            NodeValue::Map(children) => Some(Value::InlineTable(
                children
                    .iter()
                    .filter_map(|(key, child)| child.to_value().map(|value| (key.as_str(), value)))
                    .collect::<InlineTable>(),
            )),
        }
    }
}

fn comment_lines(comment: &str) -> String {
    comment.lines().map(|line| format!("# {line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_child_lookup_is_virtual() {
        let tree = ConfigNode::table();
        assert!(!tree.has_child(&["Waypoints", "visible"]));
        assert!(tree.child(&["Waypoints"]).is_none());
        // Looking up must not have created anything
        assert!(tree.keys().is_empty());
    }

    #[test]
    fn test_node_mut_materializes_path() {
        let mut tree = ConfigNode::table();
        tree.node_mut(&["Waypoints", "location", "x"]).set(12);

        assert!(tree.has_child(&["Waypoints"]));
        assert!(tree.has_child(&["Waypoints", "location"]));
        assert_eq!(tree.child(&["Waypoints", "location", "x"]).and_then(ConfigNode::as_int), Some(12));
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let mut tree = ConfigNode::table();
        tree.node_mut(&["cleared"]).clear();

        assert!(tree.has_child(&["cleared"]));
        assert!(tree.child(&["cleared"]).unwrap().is_null());
        assert!(!tree.has_child(&["missing"]));
    }

    #[test]
    fn test_scalar_is_replaced_when_descending() {
        let mut tree = ConfigNode::table();
        tree.node_mut(&["a"]).set("scalar");
        tree.node_mut(&["a", "b"]).set(true);
        assert_eq!(tree.child(&["a", "b"]).and_then(ConfigNode::as_bool), Some(true));
    }

    #[test]
    fn test_remove_detaches_node() {
        let mut tree = ConfigNode::table();
        tree.node_mut(&["a", "b"]).set(1);
        assert!(tree.remove(&["a", "b"]).is_some());
        assert!(!tree.has_child(&["a", "b"]));
        assert!(tree.has_child(&["a"]));
        assert!(tree.remove(&["a", "b"]).is_none());
    }

    #[test]
    fn test_toml_round_trip_skips_nulls() {
        let source = r##"
[Waypoints]
server-handles-waypoints = true

[[Waypoints.default-waypoints]]
name = "Spawn"
color = "#FF0000"

[Waypoints.default-waypoints.location]
world = "world"
x = 0
y = 100
z = 0
"##;
        let mut tree = ConfigNode::from_toml_str(source).unwrap();
        tree.node_mut(&["Waypoints", "unset"]).clear();

        let rendered = tree.to_toml_string().unwrap();
        assert!(!rendered.contains("unset"));

        let reparsed = ConfigNode::from_toml_str(&rendered).unwrap();
        let waypoints = reparsed.child(&["Waypoints", "default-waypoints"]).unwrap();
        let first = &waypoints.as_list().unwrap()[0];
        assert_eq!(first.child(&["name"]).and_then(ConfigNode::as_str), Some("Spawn"));
        assert_eq!(first.child(&["location", "y"]).and_then(ConfigNode::as_int), Some(100));
    }

    #[test]
    fn test_comments_are_rendered_above_entries() {
        let mut tree = ConfigNode::table();
        let flag = tree.node_mut(&["Waypoints", "server-handles-waypoints"]);
        flag.set(false);
        flag.set_comment("Set to 'true' to let servers handle waypoints, otherwise 'false'.");
        let spawn = tree.node_mut(&["Waypoints", "spawn"]);
        spawn.node_mut(&["x"]).set(1);
        spawn.set_comment("First line\nSecond line");

        let rendered = tree.to_toml_string().unwrap();
        assert!(rendered.contains(
            "# Set to 'true' to let servers handle waypoints, otherwise 'false'.\nserver-handles-waypoints = false"
        ));
        assert!(rendered.contains("# First line\n# Second line\n[Waypoints.spawn]"));

        let reparsed = ConfigNode::from_toml_str(&rendered).unwrap();
        assert_eq!(
            reparsed.child(&["Waypoints", "server-handles-waypoints"]).and_then(ConfigNode::as_bool),
            Some(false)
        );
        assert_eq!(reparsed.child(&["Waypoints", "spawn", "x"]).and_then(ConfigNode::as_int), Some(1));
    }

    #[test]
    fn test_empty_table_keeps_its_header() {
        let mut tree = ConfigNode::table();
        tree.node_mut(&["Titles"]);
        let reparsed = ConfigNode::from_toml_str(&tree.to_toml_string().unwrap()).unwrap();
        assert!(reparsed.has_child(&["Titles"]));
    }

    #[test]
    fn test_non_table_root_is_rejected() {
        let root = ConfigNode::with_value(5);
        assert!(matches!(root.to_toml_string(), Err(ConfigError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut tree = ConfigNode::table();
        tree.node_mut(&["Titles", "enabled"]).set(true);
        tree.save_file(temp_file.path()).await.unwrap();

        let loaded = ConfigNode::load_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.child(&["Titles", "enabled"]).and_then(ConfigNode::as_bool), Some(true));
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ConfigNode::load_file(dir.path().join("modules.toml")).await.unwrap();
        assert_eq!(loaded, ConfigNode::table());
    }
}
