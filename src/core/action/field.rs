//! Typed form fields.
//!
//! A field's HTML-style `type` string maps onto one [`FieldKind`] case that
//! carries the constraints meaningful for that type. Default values are
//! coerced into a [`FieldValue`] matching the kind.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextVariant {
    Text,
    Email,
    Search,
    Tel,
    Url,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateVariant {
    Date,
    Month,
    Week,
    Time,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberVariant {
    Number,
    Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BooleanVariant {
    Checkbox,
    Radio,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Where a select field gets its options from.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectOptions {
    Inline(Vec<SelectOption>),
    /// Options are fetched from `href`; each entry's `prompt_field` is the
    /// label and `value_field` the submitted value.
    Linked {
        href: String,
        templated: bool,
        prompt_field: String,
        value_field: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text {
        variant: TextVariant,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<String>,
        placeholder: Option<String>,
    },
    TextArea {
        min_length: Option<usize>,
        max_length: Option<usize>,
        placeholder: Option<String>,
        cols: Option<u32>,
        rows: Option<u32>,
    },
    Password {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<String>,
        placeholder: Option<String>,
    },
    Hidden,
    Date {
        variant: DateVariant,
        min: Option<String>,
        max: Option<String>,
        step: Option<f64>,
    },
    Number {
        variant: NumberVariant,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
    },
    DateTimeLocal {
        min: Option<NaiveDateTime>,
        max: Option<NaiveDateTime>,
        step: Option<f64>,
    },
    Color,
    Boolean {
        variant: BooleanVariant,
    },
    Select {
        options: SelectOptions,
        multiple: bool,
        min_items: Option<usize>,
        max_items: Option<usize>,
        selected_values: Vec<String>,
    },
}

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text {
            variant: TextVariant::Text,
            min_length: None,
            max_length: None,
            pattern: None,
            placeholder: None,
        }
    }

    /// Kind for an input `type` string, without constraints.
    ///
    /// Unknown types (and `file`) degrade to plain text.
    pub fn for_input_type(input_type: &str) -> Self {
        let text = |variant| FieldKind::Text {
            variant,
            min_length: None,
            max_length: None,
            pattern: None,
            placeholder: None,
        };
        let date = |variant| FieldKind::Date {
            variant,
            min: None,
            max: None,
            step: None,
        };
        let number = |variant| FieldKind::Number {
            variant,
            min: None,
            max: None,
            step: None,
        };

        match input_type.to_ascii_lowercase().as_str() {
            "email" => text(TextVariant::Email),
            "search" => text(TextVariant::Search),
            "tel" => text(TextVariant::Tel),
            "url" => text(TextVariant::Url),
            "textarea" => FieldKind::TextArea {
                min_length: None,
                max_length: None,
                placeholder: None,
                cols: None,
                rows: None,
            },
            "password" => FieldKind::Password {
                min_length: None,
                max_length: None,
                pattern: None,
                placeholder: None,
            },
            "hidden" => FieldKind::Hidden,
            "date" => date(DateVariant::Date),
            "month" => date(DateVariant::Month),
            "week" => date(DateVariant::Week),
            "time" => date(DateVariant::Time),
            "number" => number(NumberVariant::Number),
            "range" => number(NumberVariant::Range),
            "datetime-local" | "datetime" => FieldKind::DateTimeLocal {
                min: None,
                max: None,
                step: None,
            },
            "color" => FieldKind::Color,
            "checkbox" => FieldKind::Boolean {
                variant: BooleanVariant::Checkbox,
            },
            "radio" => FieldKind::Boolean {
                variant: BooleanVariant::Radio,
            },
            _ => text(TextVariant::Text),
        }
    }

    /// The input `type` string this kind renders as.
    pub fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Text { variant, .. } => match variant {
                TextVariant::Text => "text",
                TextVariant::Email => "email",
                TextVariant::Search => "search",
                TextVariant::Tel => "tel",
                TextVariant::Url => "url",
            },
            FieldKind::TextArea { .. } => "textarea",
            FieldKind::Password { .. } => "password",
            FieldKind::Hidden => "hidden",
            FieldKind::Date { variant, .. } => match variant {
                DateVariant::Date => "date",
                DateVariant::Month => "month",
                DateVariant::Week => "week",
                DateVariant::Time => "time",
            },
            FieldKind::Number { variant, .. } => match variant {
                NumberVariant::Number => "number",
                NumberVariant::Range => "range",
            },
            FieldKind::DateTimeLocal { .. } => "datetime-local",
            FieldKind::Color => "color",
            FieldKind::Boolean { variant } => match variant {
                BooleanVariant::Checkbox => "checkbox",
                BooleanVariant::Radio => "radio",
            },
            FieldKind::Select { .. } => "select",
        }
    }

    /// Apply generic descriptor constraints (`minLength`, `min`, `step`, ...)
    /// found in a JSON object using the given key names.
    pub(crate) fn apply_constraints(&mut self, source: &Map<String, Value>) {
        let usize_of = |key: &str| source.get(key).and_then(coerce_number).map(|n| n as usize);
        let f64_of = |key: &str| source.get(key).and_then(coerce_number);
        let str_of = |key: &str| source.get(key).and_then(value_to_string);

        match self {
            FieldKind::Text {
                min_length,
                max_length,
                pattern,
                placeholder,
                ..
            }
            | FieldKind::Password {
                min_length,
                max_length,
                pattern,
                placeholder,
            } => {
                *min_length = usize_of("minLength");
                *max_length = usize_of("maxLength");
                *pattern = str_of("regex").or_else(|| str_of("pattern"));
                *placeholder = str_of("placeholder");
            }
            FieldKind::TextArea {
                min_length,
                max_length,
                placeholder,
                cols,
                rows,
            } => {
                *min_length = usize_of("minLength");
                *max_length = usize_of("maxLength");
                *placeholder = str_of("placeholder");
                *cols = usize_of("cols").map(|n| n as u32);
                *rows = usize_of("rows").map(|n| n as u32);
            }
            FieldKind::Date { min, max, step, .. } => {
                *min = str_of("min");
                *max = str_of("max");
                *step = f64_of("step");
            }
            FieldKind::Number { min, max, step, .. } => {
                *min = f64_of("min");
                *max = f64_of("max");
                *step = f64_of("step");
            }
            FieldKind::DateTimeLocal { min, max, step } => {
                *min = source.get("min").and_then(coerce_datetime);
                *max = source.get("max").and_then(coerce_datetime);
                *step = f64_of("step");
            }
            FieldKind::Hidden
            | FieldKind::Color
            | FieldKind::Boolean { .. }
            | FieldKind::Select { .. } => {}
        }
    }
}

/// A field's default value, typed by its kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    List(Vec<String>),
}

impl FieldValue {
    /// Coerce a raw JSON value for a field of `kind`. Returns `None` when
    /// the value is null or cannot be coerced.
    pub fn coerce(kind: &FieldKind, raw: &Value) -> Option<FieldValue> {
        if raw.is_null() {
            return None;
        }
        match kind {
            FieldKind::Number { .. } => coerce_number(raw).map(FieldValue::Number),
            FieldKind::Boolean { .. } => coerce_bool(raw).map(FieldValue::Bool),
            FieldKind::DateTimeLocal { .. } => coerce_datetime(raw).map(FieldValue::DateTime),
            FieldKind::Select { multiple: true, .. } => match raw {
                Value::Array(items) => Some(FieldValue::List(
                    items.iter().filter_map(value_to_string).collect(),
                )),
                other => value_to_string(other).map(|s| FieldValue::List(vec![s])),
            },
            _ => value_to_string(raw).map(FieldValue::Text),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// One input of a form.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Dot-separated paths (`address.city`) address nested objects.
    pub name: String,
    pub label: Option<String>,
    pub required: bool,
    pub read_only: bool,
    pub value: Option<FieldValue>,
    /// Format-specific members that have no typed counterpart.
    pub extensions: Map<String, Value>,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: false,
            read_only: false,
            value: None,
            extensions: Map::new(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::text())
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Set the default from a raw JSON value, coercing by kind.
    pub fn with_raw_value(mut self, raw: &Value) -> Self {
        self.value = FieldValue::coerce(&self.kind, raw);
        self
    }

    #[inline]
    pub fn input_type(&self) -> &'static str {
        self.kind.input_type()
    }

    /// Name split on `.`.
    pub fn path(&self) -> Vec<&str> {
        self.name.split('.').filter(|s| !s.is_empty()).collect()
    }
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" | "checked" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn coerce_datetime(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
