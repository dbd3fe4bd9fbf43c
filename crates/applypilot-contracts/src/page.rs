//! The host adapter's view of the current page.
//!
//! A `PageSnapshot` is what every classifier reads. The host builds it with
//! guarded DOM reads: anything it cannot read is simply absent, so the
//! classifiers only ever see "found" or "not found".

use serde::{Deserialize, Serialize};

/// Input types that autofill can populate with a profile answer.
const FILLABLE_INPUT_TYPES: &[&str] = &[
    "text", "email", "tel", "number", "url", "textarea", "select", "date", "search",
];

/// One form control on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputField {
    /// Lowercase input type ("text", "email", "password", "checkbox", "textarea", ...).
    pub input_type: String,
    /// The `name` or `id` attribute, whichever the host found first.
    pub name: String,
    /// Associated label text, if any.
    pub label: String,
    /// Whether the control is rendered and not hidden.
    pub visible: bool,
    /// Whether the control already holds a value.
    pub has_value: bool,
}

impl InputField {
    /// Build a visible, empty field of the given type.
    pub fn visible(input_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            name: name.into(),
            label: String::new(),
            visible: true,
            has_value: false,
        }
    }

    /// True for the text-like types autofill can populate.
    pub fn is_fillable(&self) -> bool {
        FILLABLE_INPUT_TYPES.contains(&self.input_type.as_str())
    }
}

/// How a clickable control is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    Submit,
    #[default]
    Button,
    Link,
}

/// A clickable affordance (button, submit input, or link styled as a button).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageButton {
    /// Visible text, trimmed.
    pub text: String,
    pub kind: ButtonKind,
    pub visible: bool,
}

impl PageButton {
    pub fn visible(text: impl Into<String>, kind: ButtonKind) -> Self {
        Self {
            text: text.into(),
            kind,
            visible: true,
        }
    }
}

/// A `<form>` element's addressing attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageForm {
    /// The `action` attribute (may be relative or empty).
    pub action: String,
    /// The `id` attribute.
    pub id: String,
}

/// Everything the engine knows about the page at one moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Rendered text of the document body.
    pub visible_text: String,
    pub inputs: Vec<InputField>,
    pub buttons: Vec<PageButton>,
    pub forms: Vec<PageForm>,
    /// Structural markers the host detected (e.g. "data-automation-id",
    /// "#grnhse_app", "captcha:recaptcha").
    pub markers: Vec<String>,
    /// Number of visible inline validation errors.
    pub error_markers: u32,
    /// `src` of embedded frames.
    pub frame_sources: Vec<String>,
}

impl PageSnapshot {
    /// Visible inputs autofill could populate.
    pub fn fillable_inputs(&self) -> impl Iterator<Item = &InputField> {
        self.inputs.iter().filter(|i| i.visible && i.is_fillable())
    }

    /// True if a visible password field exists.
    pub fn has_password_field(&self) -> bool {
        self.inputs
            .iter()
            .any(|i| i.visible && i.input_type == "password")
    }

    /// Visible button texts, lowercased.
    pub fn button_texts(&self) -> impl Iterator<Item = String> + '_ {
        self.buttons
            .iter()
            .filter(|b| b.visible)
            .map(|b| b.text.trim().to_lowercase())
    }

    /// True if any visible control is a submit-kind button.
    pub fn has_submit_control(&self) -> bool {
        self.buttons
            .iter()
            .any(|b| b.visible && b.kind == ButtonKind::Submit)
    }

    /// Case-insensitive marker lookup.
    pub fn has_marker(&self, marker: &str) -> bool {
        let marker = marker.to_lowercase();
        self.markers.iter().any(|m| m.to_lowercase() == marker)
    }
}
