//! Typed field declarations and the validators that normalize their values.

pub mod composite;
pub mod timestamp;

use crate::{
    core::value::{Value, in_i64_range},
    error::{FieldError, Result},
};
use chrono::{DateTime, Utc};
use timestamp::{ParsedMoment, TimeZoneSpec, parse_moment, render_utc};

/// Coercion rule of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    Text,
    Timestamp { timezone: TimeZoneSpec },
    /// Composite value with declared children, in declaration order.
    Object { children: Vec<(String, Field)> },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Text => "text",
            FieldKind::Timestamp { .. } => "timestamp",
            FieldKind::Object { .. } => "object",
        }
    }
}

/// A named, typed leaf of a document schema.
///
/// The name is assigned once, either with [`Field::named`] or by an enclosing
/// composite field which qualifies its children as `parent.child`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: Option<String>,
    kind: FieldKind,
    multi: bool,
    required: bool,
    default: Option<Value>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            name: None,
            kind,
            multi: false,
            required: false,
            default: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    /// Timestamp field using the default `+08:00` zone for naive inputs.
    pub fn timestamp() -> Self {
        Self::timestamp_in(TimeZoneSpec::default())
    }

    pub fn timestamp_in(timezone: TimeZoneSpec) -> Self {
        Self::new(FieldKind::Timestamp { timezone })
    }

    pub fn object<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Field)>,
        K: Into<String>,
    {
        let children = children
            .into_iter()
            .map(|(key, field)| (key.into(), field))
            .collect();
        Self::new(FieldKind::Object { children })
    }

    /// Assigns the field's name. A field that already has a name keeps it.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if self.name.is_none() {
            self.assign_name(name.into());
        }
        self
    }

    fn assign_name(&mut self, name: String) {
        if let FieldKind::Object { children } = &mut self.kind {
            for (key, child) in children.iter_mut() {
                child.assign_name(format!("{name}.{key}"));
            }
        }
        self.name = Some(name);
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares a default value. The default is validated like any other value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Result<Self> {
        let value = self.validate(&value.into())?;
        self.default = Some(value);
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn children(&self) -> &[(String, Field)] {
        match &self.kind {
            FieldKind::Object { children } => children,
            _ => &[],
        }
    }

    pub fn child(&self, key: &str) -> Option<&Field> {
        self.children()
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, field)| field)
    }

    /// Normalizes `value` according to the field's kind.
    pub fn validate(&self, value: &Value) -> Result<Value> {
        match &self.kind {
            FieldKind::Integer => self.validate_integer(value),
            FieldKind::Float => self.validate_float(value),
            FieldKind::Boolean => self.validate_boolean(value),
            FieldKind::Text => Ok(Value::String(value.to_string())),
            FieldKind::Timestamp { timezone } => self.validate_timestamp(value, timezone),
            FieldKind::Object { children } => composite::validate_object(self, children, value),
        }
    }

    pub(crate) fn invalid(&self, value: &Value, reason: impl Into<String>) -> FieldError {
        FieldError::Validation {
            field: self.display_name().to_string(),
            expected: self.kind.name(),
            value: format!("{} '{}'", value.type_name(), value),
            reason: reason.into(),
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn validate_integer(&self, value: &Value) -> Result<Value> {
        let fractional = match value {
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Json(serde_json::Value::Number(n)) if n.as_i64().is_none() => n.as_f64(),
            _ => None,
        };
        if let Some(v) = fractional {
            if !in_i64_range(v) {
                return Err(self.invalid(value, "out of integer range"));
            }
            return Ok(Value::Int(v.trunc() as i64));
        }

        let parsed = match value {
            Value::Int(v) => Some(*v),
            Value::Boolean(v) => Some(i64::from(*v)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Json(serde_json::Value::Number(n)) => n.as_i64(),
            Value::Json(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Value::Int)
            .ok_or_else(|| self.invalid(value, "not an integer"))
    }

    fn validate_float(&self, value: &Value) -> Result<Value> {
        let parsed = match value {
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Int(_) | Value::Float(_) | Value::String(_) => value.as_f64(),
            Value::Json(serde_json::Value::Number(n)) => n.as_f64(),
            Value::Json(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .map(Value::Float)
            .ok_or_else(|| self.invalid(value, "not a number"))
    }

    fn validate_boolean(&self, value: &Value) -> Result<Value> {
        let flag = match value {
            Value::Boolean(v) => *v,
            Value::Json(serde_json::Value::Bool(v)) => *v,
            Value::String(_) | Value::Json(serde_json::Value::String(_)) => {
                let text = value.as_str().unwrap_or_default();
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(self.invalid(value, "expected 'true' or 'false'")),
                }
            }
            other => other.is_truthy(),
        };
        Ok(Value::String(flag.to_string()))
    }

    fn validate_timestamp(&self, value: &Value, timezone: &TimeZoneSpec) -> Result<Value> {
        let moment: DateTime<Utc> = match value {
            Value::Int(millis) => DateTime::from_timestamp_millis(*millis)
                .ok_or_else(|| self.invalid(value, "epoch milliseconds out of range"))?,
            Value::Json(serde_json::Value::Number(n)) if n.is_i64() => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| self.invalid(value, "epoch milliseconds out of range"))?,
            Value::Timestamp(dt) => dt.with_timezone(&Utc),
            Value::TimestampNaive(naive) => self.localize(value, timezone, naive)?,
            Value::Date(date) => self.localize(value, timezone, &date.and_time(chrono::NaiveTime::MIN))?,
            Value::String(_) | Value::Json(serde_json::Value::String(_)) => {
                let text = value.as_str().unwrap_or_default();
                match parse_moment(text) {
                    Some(ParsedMoment::Aware(dt)) => dt.with_timezone(&Utc),
                    Some(ParsedMoment::Naive(naive)) => self.localize(value, timezone, &naive)?,
                    None => return Err(self.invalid(value, "unrecognized date/time format")),
                }
            }
            _ => return Err(self.invalid(value, "expected a date, date string or epoch milliseconds")),
        };
        Ok(Value::String(render_utc(&moment)))
    }

    fn localize(
        &self,
        value: &Value,
        timezone: &TimeZoneSpec,
        naive: &chrono::NaiveDateTime,
    ) -> Result<DateTime<Utc>> {
        timezone
            .localize(naive)
            .ok_or_else(|| self.invalid(value, format!("local time does not exist in {timezone}")))
    }
}
