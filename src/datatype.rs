// configdata is opaque JSON as far as the store is concerned
use serde_json::{Map, Value};

// used to keep the registered field types
use std::collections::BTreeMap;
use std::sync::Arc;

// tags must be short lowercase identifiers
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{FieldkeeperError, Result};

lazy_static! {
    static ref TYPE_TAG: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
}

pub trait FieldType: Send + Sync {
    // static stuff which needs to be implemented downstream
    const TYPE: &'static str;
    /// Checks the type specific part of a field's configdata.
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()>;
    // instance callable with pre-made implementation
    fn field_type(&self) -> &'static str {
        Self::TYPE
    }
}

/// Object safe face of [`FieldType`], which is what the registry stores.
pub trait Plugin: Send + Sync {
    fn tag(&self) -> &'static str;
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()>;
}
impl<T: FieldType> Plugin for T {
    fn tag(&self) -> &'static str {
        self.field_type()
    }
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        FieldType::validate(self, configdata)
    }
}

fn invalid(field_type: &str, message: impl std::fmt::Display) -> FieldkeeperError {
    FieldkeeperError::InvalidField(format!("{field_type}: {message}"))
}

fn optional_str<'a>(configdata: &'a Map<String, Value>, key: &str, field_type: &str) -> Result<Option<&'a str>> {
    match configdata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(field_type, format!("'{key}' must be a string"))),
    }
}

fn optional_u64(configdata: &Map<String, Value>, key: &str, field_type: &str) -> Result<Option<u64>> {
    match configdata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(field_type, format!("'{key}' must be a non-negative integer"))),
    }
}

// ------------- Field Types --------------
pub struct Text;
impl FieldType for Text {
    const TYPE: &'static str = "text";
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        let displaysize = optional_u64(configdata, "displaysize", Self::TYPE)?;
        let maxlength = optional_u64(configdata, "maxlength", Self::TYPE)?;
        if displaysize == Some(0) || displaysize.is_some_and(|size| size > 200) {
            return Err(invalid(Self::TYPE, "'displaysize' must be between 1 and 200"));
        }
        if maxlength == Some(0) || maxlength.is_some_and(|length| length > 1333) {
            return Err(invalid(Self::TYPE, "'maxlength' must be between 1 and 1333"));
        }
        if let Some(default) = optional_str(configdata, "defaultvalue", Self::TYPE)? {
            if maxlength.is_some_and(|length| default.chars().count() as u64 > length) {
                return Err(invalid(Self::TYPE, "'defaultvalue' is longer than 'maxlength'"));
            }
        }
        Ok(())
    }
}

pub struct Textarea;
impl FieldType for Textarea {
    const TYPE: &'static str = "textarea";
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        optional_str(configdata, "defaultvalue", Self::TYPE)?;
        Ok(())
    }
}

pub struct Select;
impl Select {
    /// Options are kept one per line, as entered by the administrator.
    pub fn options(configdata: &Map<String, Value>) -> Vec<String> {
        configdata
            .get("options")
            .and_then(Value::as_str)
            .map(|options| {
                options
                    .lines()
                    .map(str::trim)
                    .filter(|option| !option.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}
impl FieldType for Select {
    const TYPE: &'static str = "select";
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        optional_str(configdata, "options", Self::TYPE)?;
        let options = Self::options(configdata);
        if options.is_empty() {
            return Err(invalid(Self::TYPE, "at least one option is required"));
        }
        if let Some(default) = optional_str(configdata, "defaultvalue", Self::TYPE)? {
            if !default.is_empty() && !options.iter().any(|option| option == default) {
                return Err(invalid(Self::TYPE, "'defaultvalue' must be one of the options"));
            }
        }
        Ok(())
    }
}

pub struct Checkbox;
impl FieldType for Checkbox {
    const TYPE: &'static str = "checkbox";
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        match configdata.get("checkbydefault") {
            None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
            Some(Value::Number(n)) if n.as_u64().is_some_and(|n| n <= 1) => Ok(()),
            Some(_) => Err(invalid(Self::TYPE, "'checkbydefault' must be a boolean")),
        }
    }
}

pub struct Date;
impl FieldType for Date {
    const TYPE: &'static str = "date";
    fn validate(&self, configdata: &Map<String, Value>) -> Result<()> {
        let mut bounds = Vec::new();
        for key in ["mindate", "maxdate"] {
            match configdata.get(key) {
                None | Some(Value::Null) => bounds.push(None),
                Some(value) => {
                    let timestamp = value
                        .as_i64()
                        .ok_or_else(|| invalid(Self::TYPE, format!("'{key}' must be a timestamp")))?;
                    chrono::DateTime::from_timestamp(timestamp, 0)
                        .ok_or_else(|| invalid(Self::TYPE, format!("'{key}' is out of range")))?;
                    bounds.push(Some(timestamp));
                }
            }
        }
        if let [Some(min), Some(max)] = bounds[..] {
            if min > max {
                return Err(invalid(Self::TYPE, "'mindate' is after 'maxdate'"));
            }
        }
        Ok(())
    }
}

// ------------- Registry --------------
/// Maps type tags to field types. Unknown tags are rejected rather than
/// resolved dynamically.
#[derive(Clone, Default)]
pub struct FieldTypeRegistry {
    types: BTreeMap<&'static str, Arc<dyn Plugin>>,
}
impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// A registry holding text, textarea, select, checkbox and date.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        // the built-in tags are well formed and distinct
        for plugin in [
            Arc::new(Text) as Arc<dyn Plugin>,
            Arc::new(Textarea),
            Arc::new(Select),
            Arc::new(Checkbox),
            Arc::new(Date),
        ] {
            registry.types.insert(plugin.tag(), plugin);
        }
        registry
    }
    pub fn register<T: FieldType + 'static>(&mut self, field_type: T) -> Result<()> {
        let tag = T::TYPE;
        if !TYPE_TAG.is_match(tag) {
            return Err(FieldkeeperError::Config(format!(
                "'{tag}' is not a valid field type tag"
            )));
        }
        if self.types.contains_key(tag) {
            return Err(FieldkeeperError::Config(format!(
                "field type '{tag}' is already registered"
            )));
        }
        self.types.insert(tag, Arc::new(field_type));
        Ok(())
    }
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn Plugin>> {
        self.types
            .get(tag)
            .cloned()
            .ok_or_else(|| FieldkeeperError::UnknownFieldType(tag.to_string()))
    }
    pub fn tags(&self) -> Vec<&'static str> {
        self.types.keys().copied().collect()
    }
    /// Validates configdata for a type and returns the text that gets stored.
    /// A missing configdata is stored as an empty object.
    pub fn prepare(&self, tag: &str, configdata: Option<&Value>) -> Result<String> {
        let plugin = self.resolve(tag)?;
        let empty = Value::Object(Map::new());
        let configdata = configdata.unwrap_or(&empty);
        let object = configdata
            .as_object()
            .ok_or_else(|| invalid(tag, "configdata must be a JSON object"))?;
        plugin.validate(object)?;
        Ok(serde_json::to_string(configdata)?)
    }
}
