//! Typed configuration attributes.
//!
//! DRAC subsystems (iDRAC card, BIOS) expose their settings as three DCIM
//! classes: an enumeration class, a string class and an integer class. Each
//! instance parses into an [`Attribute`] whose [`AttributeKind`] carries
//! the constraints of its class. Attributes are plain values: they are
//! rebuilt from every listing and never change locally. A write only stages
//! a pending value on the controller.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{find_integer, find_nullable_value, find_value, Element};

/// Class of an attribute namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Enumerable,
    String,
    Integer,
}

impl AttributeType {
    /// Attribute type served by `resource`, if it is an attribute class.
    #[must_use]
    pub fn of(resource: Resource) -> Option<Self> {
        match resource {
            Resource::BiosEnumeration | Resource::IdracCardEnumeration => Some(Self::Enumerable),
            Resource::BiosString | Resource::IdracCardString => Some(Self::String),
            Resource::BiosInteger | Resource::IdracCardInteger => Some(Self::Integer),
            _ => None,
        }
    }
}

/// A candidate or stored attribute value.
///
/// The wire format is always text; integers are kept apart so callers can
/// pass them without formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Text(String),
}

impl AttributeValue {
    /// Integer form, parsing text when needed.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Type-specific state and constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    Enumerable {
        current_value: Option<String>,
        pending_value: Option<String>,
        possible_values: Vec<String>,
    },
    String {
        current_value: Option<String>,
        pending_value: Option<String>,
        min_length: u32,
        max_length: u32,
        /// Regular expression the value must contain a match for.
        pattern: Option<String>,
    },
    Integer {
        current_value: Option<i64>,
        pending_value: Option<i64>,
        lower_bound: i64,
        upper_bound: i64,
    },
}

/// One remotely configurable setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    /// Fully qualified id, e.g. `iDRAC.Embedded.1#SSH.1#Enable`.
    pub instance_id: Option<String>,
    /// Group the attribute is addressed under, e.g. `SSH.1`. Only set for
    /// iDRAC card attributes.
    pub group_id: Option<String>,
    pub read_only: bool,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// Why a candidate value was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("attribute '{attribute}' cannot be set to value '{value}'. It must be in [{}]", possible_values.join(", "))]
    NotPossibleValue {
        attribute: String,
        value: String,
        possible_values: Vec<String>,
    },

    #[error("attribute '{attribute}' cannot be set to value '{value}'. It must match regex '{pattern}'")]
    PatternMismatch {
        attribute: String,
        value: String,
        pattern: String,
    },

    #[error("attribute '{attribute}' has an unusable value expression '{pattern}': {reason}")]
    InvalidPattern {
        attribute: String,
        pattern: String,
        reason: String,
    },

    #[error("attribute '{attribute}' cannot be set to value '{value}'. It must be an integer")]
    NotAnInteger { attribute: String, value: String },

    #[error("attribute '{attribute}' cannot be set to value '{value}'. It must be between {lower_bound} and {upper_bound}")]
    OutOfRange {
        attribute: String,
        value: i64,
        lower_bound: i64,
        upper_bound: i64,
    },
}

impl Attribute {
    /// Parse one instance enumerated from `resource`.
    ///
    /// # Errors
    /// [`DracError::InvalidParameter`] when `resource` is not an attribute
    /// class, and the field errors of [`find_value`] or
    /// [`DracError::InvalidResponse`] for malformed required fields.
    pub fn parse(fragment: &Element, resource: Resource) -> Result<Self> {
        let kind = AttributeType::of(resource).ok_or_else(|| {
            DracError::InvalidParameter(format!("{resource} is not an attribute class"))
        })?;
        let ns = resource.uri();

        let name = find_value(fragment, &ns, "AttributeName")?;
        let read_only = parse_bool(&find_value(fragment, &ns, "IsReadOnly")?, "IsReadOnly")?;
        let instance_id = find_nullable_value(fragment, &ns, "InstanceID");
        // BIOS attributes are addressed by bare name; their GroupID is display-only.
        let group_id = find_nullable_value(fragment, &ns, "GroupID")
            .filter(|g| !g.is_empty() && is_grouped(resource));
        let current_value = find_nullable_value(fragment, &ns, "CurrentValue");
        let pending_value = find_nullable_value(fragment, &ns, "PendingValue");

        let kind = match kind {
            AttributeType::Enumerable => AttributeKind::Enumerable {
                current_value,
                pending_value,
                possible_values: fragment
                    .find_all(&ns, "PossibleValues")
                    .into_iter()
                    .filter(|e| !e.is_nil())
                    .filter_map(Element::text)
                    .map(|v| v.trim().to_string())
                    .collect(),
            },
            // Compiled on validation, so one unusable expression only
            // affects writes to that attribute.
            AttributeType::String => AttributeKind::String {
                current_value,
                pending_value,
                min_length: parse_length(fragment, &ns, "MinLength")?,
                max_length: parse_length(fragment, &ns, "MaxLength")?,
                pattern: find_nullable_value(fragment, &ns, "ValueExpression"),
            },
            AttributeType::Integer => AttributeKind::Integer {
                current_value: coerce_integer(current_value, "CurrentValue")?,
                pending_value: coerce_integer(pending_value, "PendingValue")?,
                lower_bound: find_integer(fragment, &ns, "LowerBound")?,
                upper_bound: find_integer(fragment, &ns, "UpperBound")?,
            },
        };

        Ok(Self {
            name,
            instance_id,
            group_id,
            read_only,
            kind,
        })
    }

    /// Key the attribute is addressed by in writes and listings:
    /// `GroupID#AttributeName` when grouped, the bare name otherwise.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.group_id {
            Some(group) => format!("{group}#{}", self.name),
            None => self.name.clone(),
        }
    }

    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        match self.kind {
            AttributeKind::Enumerable { .. } => AttributeType::Enumerable,
            AttributeKind::String { .. } => AttributeType::String,
            AttributeKind::Integer { .. } => AttributeType::Integer,
        }
    }

    /// Value active on the controller.
    #[must_use]
    pub fn current_value(&self) -> Option<AttributeValue> {
        match &self.kind {
            AttributeKind::Enumerable { current_value, .. }
            | AttributeKind::String { current_value, .. } => {
                current_value.clone().map(AttributeValue::Text)
            }
            AttributeKind::Integer { current_value, .. } => current_value.map(AttributeValue::Integer),
        }
    }

    /// Value staged by an earlier write and not yet applied by a job.
    #[must_use]
    pub fn pending_value(&self) -> Option<AttributeValue> {
        match &self.kind {
            AttributeKind::Enumerable { pending_value, .. }
            | AttributeKind::String { pending_value, .. } => {
                pending_value.clone().map(AttributeValue::Text)
            }
            AttributeKind::Integer { pending_value, .. } => pending_value.map(AttributeValue::Integer),
        }
    }

    /// True when `value` equals the active value.
    #[must_use]
    pub fn is_current(&self, value: &AttributeValue) -> bool {
        self.current_value()
            .is_some_and(|current| self.same_value(&current, value))
    }

    /// True when writing `value` would change nothing: it is active and no
    /// other value is staged to replace it.
    #[must_use]
    pub fn is_settled(&self, value: &AttributeValue) -> bool {
        self.is_current(value)
            && self
                .pending_value()
                .is_none_or(|pending| self.same_value(&pending, value))
    }

    fn same_value(&self, a: &AttributeValue, b: &AttributeValue) -> bool {
        match self.kind {
            AttributeKind::Integer { .. } => a.as_integer() == b.as_integer(),
            _ => a.to_string() == b.to_string(),
        }
    }

    /// Check `value` against the attribute's constraints.
    ///
    /// Returns `None` when the value is acceptable. `read_only` is not
    /// considered here. String length bounds are informational only; the
    /// value expression is searched for anywhere in the value.
    #[must_use]
    pub fn validate(&self, value: &AttributeValue) -> Option<Rejection> {
        match &self.kind {
            AttributeKind::Enumerable {
                possible_values, ..
            } => {
                let text = value.to_string();
                if possible_values.contains(&text) {
                    None
                } else {
                    Some(Rejection::NotPossibleValue {
                        attribute: self.name.clone(),
                        value: text,
                        possible_values: possible_values.clone(),
                    })
                }
            }
            AttributeKind::String { pattern, .. } => {
                let pattern = pattern.as_ref()?;
                let text = value.to_string();
                match Regex::new(pattern) {
                    Ok(re) if re.is_match(&text) => None,
                    Ok(_) => Some(Rejection::PatternMismatch {
                        attribute: self.name.clone(),
                        value: text,
                        pattern: pattern.clone(),
                    }),
                    Err(e) => Some(Rejection::InvalidPattern {
                        attribute: self.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            AttributeKind::Integer {
                lower_bound,
                upper_bound,
                ..
            } => {
                let Some(number) = value.as_integer() else {
                    return Some(Rejection::NotAnInteger {
                        attribute: self.name.clone(),
                        value: value.to_string(),
                    });
                };
                if (*lower_bound..=*upper_bound).contains(&number) {
                    None
                } else {
                    Some(Rejection::OutOfRange {
                        attribute: self.name.clone(),
                        value: number,
                        lower_bound: *lower_bound,
                        upper_bound: *upper_bound,
                    })
                }
            }
        }
    }
}

fn is_grouped(resource: Resource) -> bool {
    matches!(
        resource,
        Resource::IdracCardEnumeration | Resource::IdracCardString | Resource::IdracCardInteger
    )
}

fn parse_bool(value: &str, field: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(DracError::InvalidResponse(format!(
            "field '{field}' is not a boolean: '{other}'"
        ))),
    }
}

fn parse_length(fragment: &Element, ns: &str, field: &str) -> Result<u32> {
    let value = find_integer(fragment, ns, field)?;
    u32::try_from(value)
        .map_err(|_| DracError::InvalidResponse(format!("field '{field}' is out of range: {value}")))
}

// Empty text is treated like an absent value.
fn coerce_integer(value: Option<String>, field: &str) -> Result<Option<i64>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| {
            DracError::InvalidResponse(format!("field '{field}' is not an integer: '{text}'"))
        }),
    }
}

/// Attributes merged from one or more namespaces, keyed by [`Attribute::key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeSet {
    attributes: BTreeMap<String, Attribute>,
}

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, failing on the first duplicate key.
    ///
    /// # Errors
    /// [`DracError::AggregationConflict`] naming the duplicated key.
    pub fn from_attributes(attributes: impl IntoIterator<Item = Attribute>) -> Result<Self> {
        let mut set = Self::new();
        for attribute in attributes {
            set.insert(attribute)?;
        }
        Ok(set)
    }

    /// Add one attribute.
    ///
    /// # Errors
    /// [`DracError::AggregationConflict`] when the key is already present;
    /// the existing entry is left untouched.
    pub fn insert(&mut self, attribute: Attribute) -> Result<()> {
        let key = attribute.key();
        if self.attributes.contains_key(&key) {
            return Err(DracError::AggregationConflict { name: key });
        }
        self.attributes.insert(key, attribute);
        Ok(())
    }

    /// Merge two disjoint sets.
    ///
    /// # Errors
    /// [`DracError::AggregationConflict`] when a key appears in both.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        for attribute in other.attributes.into_values() {
            self.insert(attribute)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }
}

impl IntoIterator for AttributeSet {
    type Item = Attribute;
    type IntoIter = std::collections::btree_map::IntoValues<String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_values()
    }
}
