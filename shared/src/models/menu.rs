//! Menu Model
//!
//! 菜单条目在不同存储后端下形状一致：静态目录 + 覆盖记录 / 远程 `menu` 文档，
//! 读取时统一经过 [`MenuItem::normalize`]。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Menu item entity (菜品)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Slug id, stable across backends
    pub id: String,
    pub name: String,
    pub category_id: String,
    /// Display label of the category
    pub category: String,
    /// Price in currency unit
    pub price: u32,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(default)]
    pub flags: Vec<String>,
    pub veg: bool,
    pub available: bool,
    #[serde(default)]
    pub sort_order: i64,
}

impl MenuItem {
    /// Normalize any raw menu document into a well-formed item.
    ///
    /// `fallback_id` is the record key, used when the body carries no id.
    pub fn normalize(raw: &Value, fallback_id: &str) -> Self {
        let field = |key: &str| raw.get(key).filter(|v| truthy(v));

        let id = field("id")
            .map(coerce_string)
            .unwrap_or_else(|| fallback_id.to_string())
            .trim()
            .to_string();
        let category = field("category")
            .map(coerce_string)
            .unwrap_or_else(|| "General".to_string())
            .trim()
            .to_string();
        let category_id = field("categoryId")
            .map(coerce_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                let slug = category_slug(&category);
                if slug.is_empty() { "general".to_string() } else { slug }
            });
        let name = field("name")
            .map(coerce_string)
            .unwrap_or_else(|| id.clone())
            .trim()
            .to_string();

        Self {
            name,
            category_id,
            category,
            price: coerce_price(raw.get("price").unwrap_or(&Value::Null)),
            tagline: field("tagline").map(coerce_string).unwrap_or_default().trim().to_string(),
            image_name: field("imageName")
                .map(coerce_string)
                .unwrap_or_default()
                .trim()
                .to_string(),
            flags: coerce_flags(raw.get("flags").unwrap_or(&Value::Null)),
            veg: raw.get("veg") != Some(&Value::Bool(false)),
            available: raw.get("available") != Some(&Value::Bool(false)),
            sort_order: coerce_number(raw.get("sortOrder").unwrap_or(&Value::Null)) as i64,
            id,
        }
    }

    /// Catalog ordering: `(categoryId, sortOrder, name)`
    pub fn catalog_order(a: &MenuItem, b: &MenuItem) -> Ordering {
        a.category_id
            .cmp(&b.category_id)
            .then(a.sort_order.cmp(&b.sort_order))
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Encode as a JSON object for shallow merging
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Partial update of a menu item (菜品覆盖)
///
/// Every field is optional; only present fields take part in the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl MenuPatch {
    /// Lenient constructor from an untrusted JSON payload.
    ///
    /// Unknown keys are dropped, values of the wrong type are coerced
    /// instead of rejected.
    pub fn from_json(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };
        let text = |key: &str| {
            obj.get(key)
                .map(|v| if truthy(v) { coerce_string(v) } else { String::new() })
        };

        Self {
            name: text("name"),
            price: obj.get("price").map(coerce_price),
            category: text("category"),
            category_id: text("categoryId"),
            tagline: text("tagline"),
            image_name: text("imageName"),
            veg: obj.get("veg").map(truthy),
            available: obj.get("available").map(truthy),
            flags: obj.get("flags").map(coerce_flags),
            sort_order: obj.get("sortOrder").map(|v| coerce_number(v) as i64),
        }
        .sanitized()
    }

    /// Trim strings and derive `categoryId` from the category label when it
    /// is absent or blank.
    pub fn sanitized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.category,
            &mut self.category_id,
            &mut self.tagline,
            &mut self.image_name,
        ] {
            if let Some(s) = field.as_mut() {
                *s = s.trim().to_string();
            }
        }
        if let Some(flags) = self.flags.as_mut() {
            flags.retain(|f| !f.trim().is_empty());
        }

        let blank_id = self.category_id.as_deref().is_none_or(str::is_empty);
        if blank_id {
            self.category_id = self
                .category
                .as_deref()
                .map(category_slug)
                .filter(|slug| !slug.is_empty());
        }
        self
    }

    /// Is this an empty patch
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Encode the present fields as a JSON object for shallow merging
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Slug of a category label: lower-case, non-alphanumeric runs collapse to a
/// single hyphen, leading/trailing hyphens trimmed.
pub fn category_slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_hyphen = false;
    for c in label.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// JSON truthiness (null, false, 0, NaN and "" are falsy)
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Price coerced to a number, floored at 0
fn coerce_price(value: &Value) -> u32 {
    coerce_number(value).max(0.0).round().min(u32::MAX as f64) as u32
}

fn coerce_flags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
