// SPDX-License-Identifier: MIT
//! Widget description data model.
//!
//! These types mirror the analysis backend's wire format closely enough to
//! pass descriptions through to the rendering surface verbatim, while staying
//! lightweight for the daemon's internal use.  A description is immutable
//! once delivered and is superseded wholesale by the next successful query —
//! there is no incremental patching.

use serde::{Deserialize, Serialize};

// ─── Description ──────────────────────────────────────────────────────────────

/// A tree of editable properties describing the UI element at a document
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDescription {
    pub properties: Vec<WidgetProperty>,
}

/// One editable property of a widget.  `id` is unique within a single
/// description and is the key used by the surface to request value changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetProperty {
    pub id: i64,
    pub is_required: bool,
    pub is_safe_to_update: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<PropertyEditor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyValue>,
    /// Nested child properties.  Tree, not DAG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WidgetProperty>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

// ─── Editors ──────────────────────────────────────────────────────────────────

/// Describes which input control the surface should render for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEditor {
    pub kind: PropertyEditorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_items: Option<Vec<EnumItem>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyEditorKind {
    Bool,
    Double,
    Enum,
    EnumLike,
    Int,
    String,
}

/// One selectable item for an `ENUM` / `ENUM_LIKE` editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumItem {
    pub library_uri: String,
    pub class_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

// ─── Values ───────────────────────────────────────────────────────────────────

/// A property's current or requested value.  At most one variant is
/// populated; a value with no variant set clears the property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_value: Option<EnumItem>,
    /// Free-form expression, used when no typed variant applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl PropertyValue {
    pub fn bool(value: bool) -> Self {
        Self {
            bool_value: Some(value),
            ..Self::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Self::default()
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
