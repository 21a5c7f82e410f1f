//! Typed module options.
//!
//! An [`OptionDescriptor`] is the immutable definition of one config leaf: its
//! path below the module's subtree, its [`ValueKind`], a default and whether
//! changes must be pushed to clients. Descriptors are typed through
//! [`OptionType`]; underneath, every value is one of the closed set of
//! [`OptionValue`] variants, and decoding is an exhaustive match over
//! [`ValueKind`].
//!
//! [`OptionSet`] holds the live values of one module. Values are published as a
//! whole map through an `ArcSwap`, so a reader sees either the state before a
//! reload or the state after it, never a mix.

use crate::config::{ConfigNode, ConfigPath};
use crate::domain::{DomainKind, DomainValue, ModSetting, Waypoint};
use crate::error::ConfigError;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// Values and kinds
// ============================================================================

/// A value held by an option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Explicit absence; distinct from an empty list
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<OptionValue>),
    Domain(DomainValue),
}

impl OptionValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            OptionValue::Null => "null",
            OptionValue::Bool(_) => "boolean",
            OptionValue::Int(_) => "integer",
            OptionValue::Str(_) => "string",
            OptionValue::List(_) => "list",
            OptionValue::Domain(domain) => domain.kind().name(),
        }
    }

    /// The value as sent to clients; null stays null.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(match self {
            OptionValue::Null => serde_json::Value::Null,
            OptionValue::Bool(flag) => serde_json::Value::Bool(*flag),
            OptionValue::Int(number) => serde_json::Value::from(*number),
            OptionValue::Str(text) => serde_json::Value::String(text.clone()),
            OptionValue::List(items) => items
                .iter()
                .map(OptionValue::to_json)
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array)?,
            OptionValue::Domain(domain) => domain.to_json()?,
        })
    }
}

/// The schema of an option's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Str,
    List(Box<ValueKind>),
    /// Either null or a value of the inner kind
    Nullable(Box<ValueKind>),
    Domain(DomainKind),
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Str => "string",
            ValueKind::List(_) => "list",
            ValueKind::Nullable(inner) => inner.name(),
            ValueKind::Domain(kind) => kind.name(),
        }
    }

    /// Reads a value of this kind from `node`; `path` is only used in errors.
    pub fn decode(&self, node: &ConfigNode, path: &ConfigPath) -> Result<OptionValue, ConfigError> {
        let mismatch = || ConfigError::TypeMismatch {
            path: path.to_string(),
            expected: self.name(),
            found: node.kind_name(),
        };

        match self {
            ValueKind::Nullable(_) if node.is_null() => Ok(OptionValue::Null),
            ValueKind::Nullable(inner) => inner.decode(node, path),
            ValueKind::Bool => node.as_bool().map(OptionValue::Bool).ok_or_else(mismatch),
            ValueKind::Int => node.as_int().map(OptionValue::Int).ok_or_else(mismatch),
            ValueKind::Str => node
                .as_str()
                .map(|text| OptionValue::Str(text.to_string()))
                .ok_or_else(mismatch),
            ValueKind::List(element) => {
                let items = node.as_list().ok_or_else(mismatch)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| element.decode(item, &path.child(index.to_string())))
                    .collect::<Result<Vec<_>, _>>()
                    .map(OptionValue::List)
            }
            ValueKind::Domain(kind) => kind.decode(node, path).map(OptionValue::Domain),
        }
    }

    /// Writes `value` into `node`, failing when the value does not fit this kind.
    pub fn encode(
        &self,
        value: &OptionValue,
        node: &mut ConfigNode,
        path: &ConfigPath,
    ) -> Result<(), ConfigError> {
        match (self, value) {
            (ValueKind::Nullable(_), OptionValue::Null) => node.clear(),
            (ValueKind::Nullable(inner), value) => inner.encode(value, node, path)?,
            (ValueKind::Bool, OptionValue::Bool(flag)) => node.set(*flag),
            (ValueKind::Int, OptionValue::Int(number)) => node.set(*number),
            (ValueKind::Str, OptionValue::Str(text)) => node.set(text.as_str()),
            (ValueKind::List(element), OptionValue::List(items)) => {
                let mut encoded = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let mut child = ConfigNode::new();
                    element.encode(item, &mut child, &path.child(index.to_string()))?;
                    encoded.push(child);
                }
                node.set(encoded);
            }
            (ValueKind::Domain(kind), OptionValue::Domain(domain)) => kind.encode(domain, node, path)?,
            (kind, value) => {
                return Err(ConfigError::TypeMismatch {
                    path: path.to_string(),
                    expected: kind.name(),
                    found: value.kind_name(),
                })
            }
        }
        Ok(())
    }
}

// ============================================================================
// Typed bridge
// ============================================================================

/// Rust types usable as option values.
pub trait OptionType: Clone + Send + Sync + 'static {
    fn kind() -> ValueKind;
    fn into_value(self) -> OptionValue;
    fn from_value(value: &OptionValue) -> Option<Self>;
}

impl OptionType for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Bool(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl OptionType for i64 {
    fn kind() -> ValueKind {
        ValueKind::Int
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Int(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(number) => Some(*number),
            _ => None,
        }
    }
}

impl OptionType for i32 {
    fn kind() -> ValueKind {
        ValueKind::Int
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Int(i64::from(self))
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(number) => i32::try_from(*number).ok(),
            _ => None,
        }
    }
}

impl OptionType for String {
    fn kind() -> ValueKind {
        ValueKind::Str
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Str(self)
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Str(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl OptionType for Waypoint {
    fn kind() -> ValueKind {
        ValueKind::Domain(DomainKind::Waypoint)
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Domain(DomainValue::Waypoint(self))
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Domain(DomainValue::Waypoint(waypoint)) => Some(waypoint.clone()),
            _ => None,
        }
    }
}

impl OptionType for ModSetting {
    fn kind() -> ValueKind {
        ValueKind::Domain(DomainKind::ModSetting)
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Domain(DomainValue::ModSetting(self))
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Domain(DomainValue::ModSetting(setting)) => Some(setting.clone()),
            _ => None,
        }
    }
}

impl<T: OptionType> OptionType for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn into_value(self) -> OptionValue {
        OptionValue::List(self.into_iter().map(T::into_value).collect())
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: OptionType> OptionType for Option<T> {
    fn kind() -> ValueKind {
        ValueKind::Nullable(Box::new(T::kind()))
    }

    fn into_value(self) -> OptionValue {
        match self {
            Some(value) => value.into_value(),
            None => OptionValue::Null,
        }
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Type-erased definition of an option, as stored in an [`OptionSet`].
#[derive(Debug)]
pub struct OptionSpec {
    path: ConfigPath,
    kind: ValueKind,
    default: OptionValue,
    notify_client: bool,
    comment: Option<String>,
}

impl OptionSpec {
    /// Path below the owning module's subtree.
    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn default_value(&self) -> &OptionValue {
        &self.default
    }

    /// Whether changes must be pushed to connected clients.
    pub fn notify_client(&self) -> bool {
        self.notify_client
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Immutable, typed option definition.
///
/// Built once at module-definition time, usually in a `static`.
///
/// # Examples
///
/// ```rust
/// use lumen_core::OptionDescriptor;
///
/// let handles = OptionDescriptor::builder(["server-handles-waypoints"], false)
///     .comment("Set to 'true' to let servers handle waypoints, otherwise 'false'.")
///     .notify_client()
///     .build();
/// assert!(handles.spec().notify_client());
/// ```
pub struct OptionDescriptor<T> {
    spec: Arc<OptionSpec>,
    default: Arc<T>,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for OptionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            default: Arc::clone(&self.default),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for OptionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("path", &self.spec.path.to_string())
            .field("kind", &self.spec.kind)
            .field("notify_client", &self.spec.notify_client)
            .finish()
    }
}

impl<T: OptionType> OptionDescriptor<T> {
    /// Starts a descriptor at `path` with the given default.
    pub fn builder<I, S>(path: I, default: T) -> OptionBuilder<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionBuilder {
            path: ConfigPath::from_segments(path),
            default,
            notify_client: false,
            comment: None,
        }
    }

    pub fn spec(&self) -> &Arc<OptionSpec> {
        &self.spec
    }

    pub fn path(&self) -> &ConfigPath {
        &self.spec.path
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

/// Builder returned by [`OptionDescriptor::builder`].
pub struct OptionBuilder<T> {
    path: ConfigPath,
    default: T,
    notify_client: bool,
    comment: Option<String>,
}

impl<T: OptionType> OptionBuilder<T> {
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn notify_client(mut self) -> Self {
        self.notify_client = true;
        self
    }

    /// # Panics
    ///
    /// Panics when the path is empty; an option must live below its module.
    pub fn build(self) -> OptionDescriptor<T> {
        assert!(!self.path.is_empty(), "option path must not be empty");
        let spec = OptionSpec {
            path: self.path,
            kind: T::kind(),
            default: self.default.clone().into_value(),
            notify_client: self.notify_client,
            comment: self.comment,
        };
        OptionDescriptor {
            spec: Arc::new(spec),
            default: Arc::new(self.default),
            _type: PhantomData,
        }
    }
}

// ============================================================================
// Option set
// ============================================================================

/// Snapshot of explicitly assigned values, keyed by option path.
pub type OptionValues = HashMap<ConfigPath, OptionValue>;

/// Live option values of one module.
///
/// Options without an assigned value read as their default.
pub struct OptionSet {
    specs: Vec<Arc<OptionSpec>>,
    values: ArcSwap<OptionValues>,
}

impl fmt::Debug for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSet")
            .field("options", &self.specs.len())
            .field("assigned", &self.values.load().len())
            .finish()
    }
}

impl Default for OptionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionSet {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            values: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Adds a descriptor. A second descriptor with an already-registered path
    /// is ignored.
    pub fn register<T: OptionType>(&mut self, descriptor: &OptionDescriptor<T>) -> &mut Self {
        if self.specs.iter().any(|spec| spec.path == descriptor.spec.path) {
            warn!("Option {} registered twice, ignoring duplicate", descriptor.spec.path);
            return self;
        }
        self.specs.push(Arc::clone(&descriptor.spec));
        self
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[Arc<OptionSpec>] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Current value, or the descriptor's default when unassigned.
    pub fn get<T: OptionType>(&self, descriptor: &OptionDescriptor<T>) -> T {
        self.values
            .load()
            .get(&descriptor.spec.path)
            .and_then(T::from_value)
            .unwrap_or_else(|| T::clone(&descriptor.default))
    }

    /// Assigns a value. Readers observe the change atomically.
    pub fn set<T: OptionType>(&self, descriptor: &OptionDescriptor<T>, value: T) {
        let path = descriptor.spec.path.clone();
        let value = value.into_value();
        self.values.rcu(|current| {
            let mut next = OptionValues::clone(current);
            next.insert(path.clone(), value.clone());
            next
        });
    }

    /// Drops the assigned value so the default applies again.
    pub fn reset<T: OptionType>(&self, descriptor: &OptionDescriptor<T>) {
        let path = &descriptor.spec.path;
        self.values.rcu(|current| {
            let mut next = OptionValues::clone(current);
            next.remove(path);
            next
        });
    }

    /// Untyped current value, falling back to the default.
    pub fn value(&self, spec: &OptionSpec) -> OptionValue {
        self.values
            .load()
            .get(&spec.path)
            .cloned()
            .unwrap_or_else(|| spec.default.clone())
    }

    /// The assigned values as one consistent snapshot.
    pub fn snapshot(&self) -> Arc<OptionValues> {
        self.values.load_full()
    }

    /// Assigns several values in one swap; readers see all of them or none.
    pub fn apply(&self, updates: Vec<(ConfigPath, OptionValue)>) {
        if updates.is_empty() {
            return;
        }
        self.values.rcu(|current| {
            let mut next = OptionValues::clone(current);
            next.extend(updates.iter().cloned());
            next
        });
    }

    /// Descriptors flagged for client notification, with their current values.
    pub fn client_notified(&self) -> Vec<(Arc<OptionSpec>, OptionValue)> {
        let values = self.values.load();
        self.specs
            .iter()
            .filter(|spec| spec.notify_client)
            .map(|spec| {
                let value = values.get(&spec.path).cloned().unwrap_or_else(|| spec.default.clone());
                (Arc::clone(spec), value)
            })
            .collect()
    }
}
