// SPDX-License-Identifier: MIT

//! State schema definitions and validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::store::State;
use crate::error::{FieldError, OrraError, ValidationError};

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(transparent)]
pub struct StateSchema {
    /// Field definitions
    fields: BTreeMap<String, TypeDescriptor>,
}

/// Expected type of a state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub enum TypeDescriptor {
    String,
    Integer,
    Number,
    Boolean,
    /// Accepts any JSON value, including null
    Any,
    /// Homogeneous list
    List(Box<TypeDescriptor>),
    /// String-keyed mapping with homogeneous values
    Map(Box<TypeDescriptor>),
    /// Nested object with its own declared fields
    Object(StateSchema),
    /// May be absent or null
    Optional(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// List of any values
    pub fn list() -> Self {
        Self::List(Box::new(Self::Any))
    }

    pub fn list_of(items: TypeDescriptor) -> Self {
        Self::List(Box::new(items))
    }

    /// Mapping of any values
    pub fn map() -> Self {
        Self::Map(Box::new(Self::Any))
    }

    pub fn map_of(values: TypeDescriptor) -> Self {
        Self::Map(Box::new(values))
    }

    /// Wrap in `Optional`; already-optional descriptors are returned as is
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Whether the field may be absent from a state
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Any)
    }

    /// Human-readable type name used in validation messages
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Any => "any".to_string(),
            Self::List(items) => format!("list[{}]", items.describe()),
            Self::Map(values) => format!("map[{}]", values.describe()),
            Self::Object(_) => "object".to_string(),
            Self::Optional(inner) => format!("optional[{}]", inner.describe()),
        }
    }

    fn check(&self, value: &Value, loc: &mut Vec<String>, errors: &mut Vec<FieldError>) {
        let matches = match (self, value) {
            (Self::Any, _) => true,
            (Self::Optional(_), Value::Null) => true,
            (Self::Optional(inner), _) => return inner.check(value, loc, errors),
            (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Number, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::List(items), Value::Array(values)) => {
                for (i, item) in values.iter().enumerate() {
                    loc.push(i.to_string());
                    items.check(item, loc, errors);
                    loc.pop();
                }
                true
            }
            (Self::Map(values), Value::Object(map)) => {
                for (key, item) in map {
                    loc.push(key.clone());
                    values.check(item, loc, errors);
                    loc.pop();
                }
                true
            }
            (Self::Object(schema), Value::Object(map)) => {
                schema.check_fields(map, loc, errors);
                true
            }
            _ => false,
        };

        if !matches {
            errors.push(FieldError::new(
                loc.clone(),
                format!(
                    "expected {}, found {}",
                    self.describe(),
                    json_type_name(value)
                ),
            ));
        }
    }
}

impl StateSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field declaration
    pub fn field(mut self, name: impl Into<String>, field_type: TypeDescriptor) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Builder-style declaration of an optional field
    pub fn optional(self, name: impl Into<String>, field_type: TypeDescriptor) -> Self {
        self.field(name, field_type.optional())
    }

    /// Parse a schema from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, OrraError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a schema from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrraError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields.get(name)
    }

    /// Declared field names, sorted
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a JSON payload and turn it into a [`State`].
    ///
    /// Reports every mismatching field, not just the first one. Absent
    /// optional fields are fine; absent required fields and undeclared
    /// fields are errors.
    pub fn validate(&self, candidate: Value) -> Result<State, ValidationError> {
        let state = State::try_from(candidate)?;
        self.check(&state)?;
        Ok(state)
    }

    /// Validate an existing state in place
    pub fn check(&self, state: &State) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        self.check_fields(state.as_map(), &mut Vec::new(), &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(errors))
        }
    }

    fn check_fields(
        &self,
        map: &Map<String, Value>,
        loc: &mut Vec<String>,
        errors: &mut Vec<FieldError>,
    ) {
        for (name, field_type) in &self.fields {
            loc.push(name.clone());
            match map.get(name) {
                Some(value) => field_type.check(value, loc, errors),
                None if field_type.is_optional() => {}
                None => errors.push(FieldError::new(loc.clone(), "field required")),
            }
            loc.pop();
        }

        for key in map.keys().filter(|k| !self.fields.contains_key(*k)) {
            loc.push(key.clone());
            errors.push(FieldError::new(loc.clone(), "undeclared field"));
            loc.pop();
        }
    }
}

/// JSON type name used in validation messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Serialized form of a [`TypeDescriptor`]
#[derive(Debug, Clone, Deserialize, Serialize)]
struct FieldSpec {
    #[serde(rename = "type")]
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Box<FieldSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Box<FieldSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, FieldSpec>>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Any,
    List,
    Map,
    Object,
}

impl TryFrom<FieldSpec> for TypeDescriptor {
    type Error = String;

    fn try_from(spec: FieldSpec) -> Result<Self, Self::Error> {
        if spec.items.is_some() && spec.kind != FieldKind::List {
            return Err("'items' is only allowed on list fields".to_string());
        }
        if spec.values.is_some() && spec.kind != FieldKind::Map {
            return Err("'values' is only allowed on map fields".to_string());
        }
        if spec.fields.is_some() && spec.kind != FieldKind::Object {
            return Err("'fields' is only allowed on object fields".to_string());
        }

        let base = match spec.kind {
            FieldKind::String => Self::String,
            FieldKind::Integer => Self::Integer,
            FieldKind::Number => Self::Number,
            FieldKind::Boolean => Self::Boolean,
            FieldKind::Any => Self::Any,
            FieldKind::List => match spec.items {
                Some(items) => Self::List(Box::new(Self::try_from(*items)?)),
                None => Self::list(),
            },
            FieldKind::Map => match spec.values {
                Some(values) => Self::Map(Box::new(Self::try_from(*values)?)),
                None => Self::map(),
            },
            FieldKind::Object => {
                let fields = spec
                    .fields
                    .ok_or("object fields must declare 'fields'")?
                    .into_iter()
                    .map(|(name, field)| Ok((name, Self::try_from(field)?)))
                    .collect::<Result<BTreeMap<_, _>, String>>()?;
                Self::Object(StateSchema { fields })
            }
        };

        Ok(if spec.optional { base.optional() } else { base })
    }
}

impl From<TypeDescriptor> for FieldSpec {
    fn from(descriptor: TypeDescriptor) -> Self {
        let plain = |kind| FieldSpec {
            kind,
            optional: false,
            items: None,
            values: None,
            fields: None,
        };

        match descriptor {
            TypeDescriptor::String => plain(FieldKind::String),
            TypeDescriptor::Integer => plain(FieldKind::Integer),
            TypeDescriptor::Number => plain(FieldKind::Number),
            TypeDescriptor::Boolean => plain(FieldKind::Boolean),
            TypeDescriptor::Any => plain(FieldKind::Any),
            TypeDescriptor::List(items) => FieldSpec {
                items: Some(Box::new((*items).into())),
                ..plain(FieldKind::List)
            },
            TypeDescriptor::Map(values) => FieldSpec {
                values: Some(Box::new((*values).into())),
                ..plain(FieldKind::Map)
            },
            TypeDescriptor::Object(schema) => FieldSpec {
                fields: Some(
                    schema
                        .fields
                        .into_iter()
                        .map(|(name, field)| (name, field.into()))
                        .collect(),
                ),
                ..plain(FieldKind::Object)
            },
            TypeDescriptor::Optional(inner) => FieldSpec {
                optional: true,
                ..(*inner).into()
            },
        }
    }
}
