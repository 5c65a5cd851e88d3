/// Sprite sheet index parser
///
/// A sprite index is a JSON object mapping icon names to entries such as
/// `"aerialway_11": { "height": 15, "pixelRatio": 1, "width": 15, "x": 314, "y": 0 }`.
/// Only `x`, `y`, `width` and `height` are interpreted; everything else is kept
/// as-is and handed back through `lookup`.
use std::io::Read;

use serde_json::{Map, Value};

use crate::error::AtlasError;

pub const ICON_X: &str = "x";
pub const ICON_Y: &str = "y";
pub const ICON_WIDTH: &str = "width";
pub const ICON_HEIGHT: &str = "height";

/// Raw per-icon entry as found in the index document.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasIndex {
    sheet: Map<String, Value>,
}

impl AtlasIndex {
    /// Parse an index from raw bytes. The bytes must be UTF-8 JSON whose root is an object.
    pub fn parse(bytes: &[u8]) -> Result<Self, AtlasError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| AtlasError::IndexParse(format!("invalid UTF-8: {}", e)))?;
        Self::from_str(text)
    }

    /// Parse an index from JSON text
    pub fn from_str(text: &str) -> Result<Self, AtlasError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| AtlasError::IndexParse(e.to_string()))?;

        match root {
            Value::Object(sheet) => Ok(Self { sheet }),
            other => Err(AtlasError::IndexParse(format!(
                "root is not an object: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Read the whole stream and parse it
    pub fn from_reader(mut reader: impl Read) -> Result<Self, AtlasError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| AtlasError::IndexParse(format!("read failed: {}", e)))?;
        Self::parse(&bytes)
    }

    pub fn empty() -> Self {
        Self { sheet: Map::new() }
    }

    /// Entry for `name`, if present and an object. Scalar, array and null entries are skipped.
    pub fn lookup(&self, name: &str) -> Option<&Metadata> {
        self.sheet.get(name).and_then(Value::as_object)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheet.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sheet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheet.is_empty()
    }

    /// Serialize the index back to compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.sheet.clone()).to_string()
    }
}

/// Read `field` from `meta` as an integer.
///
/// Fractional numbers are truncated toward zero; numbers beyond `i64` saturate.
pub fn require_int(field: &'static str, meta: &Metadata) -> Result<i64, AtlasError> {
    match meta.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .ok_or(AtlasError::Field { field }),
        _ => Err(AtlasError::Field { field }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
