//! Form compiler - typed record descriptions rendered as input trees.
//!
//! A [`FormSpec`] describes fields and their validation annotations; the
//! [`form`] function emits matching inputs through the builder surface,
//! validates on submit, and dispatches a typed [`FormData`] map to the
//! submission callback. Field state lives in [`FormState`], outside the
//! render function, so re-renders are pure.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::builder::{button, container, input, keyed, select, text};
use crate::theme::ThemeToken;
use crate::types::{Attr, EventKind, EventPayload};

// =============================================================================
// Specs
// =============================================================================

/// What kind of input a field renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Password,
    Number,
    Toggle,
    Select(Vec<String>),
}

/// One field of a form, with validation annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            min_len: None,
            max_len: None,
            min: None,
            max: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn password(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Password)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn toggle(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Toggle)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn len_range(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_len = min;
        self.max_len = max;
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// A typed record description: the fields a form renders and validates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormSpec {
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }
}

// =============================================================================
// Values and state
// =============================================================================

/// A submitted field value, typed per field kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Toggle(bool),
    Choice(u32),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Submission payload: field name to typed value.
pub type FormData = FxHashMap<String, FieldValue>;

/// Field state held outside the render function.
#[derive(Clone)]
pub struct FormState {
    values: Rc<RefCell<FormData>>,
    errors: Rc<RefCell<Vec<(String, String)>>>,
}

impl FormState {
    /// Seed state with each field's empty value.
    pub fn new(spec: &FormSpec) -> Self {
        let mut values = FormData::default();
        for field in &spec.fields {
            let initial = match &field.kind {
                FieldKind::Text | FieldKind::Password => FieldValue::Text(String::new()),
                FieldKind::Number => FieldValue::Text(String::new()),
                FieldKind::Toggle => FieldValue::Toggle(false),
                FieldKind::Select(_) => FieldValue::Choice(0),
            };
            values.insert(field.name.clone(), initial);
        }
        Self {
            values: Rc::new(RefCell::new(values)),
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn value(&self, name: &str) -> Option<FieldValue> {
        self.values.borrow().get(name).cloned()
    }

    pub fn set_value(&self, name: &str, value: FieldValue) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    /// Current validation errors as (field name, message).
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.borrow().clone()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate raw state against a spec; numbers are parsed here. Returns
/// (field name, message) per violation.
pub fn validate(spec: &FormSpec, data: &FormData) -> Vec<(String, String)> {
    let mut errors = Vec::new();
    for field in &spec.fields {
        let value = data.get(&field.name);
        match (&field.kind, value) {
            (FieldKind::Text | FieldKind::Password, Some(FieldValue::Text(s))) => {
                if field.required && s.is_empty() {
                    errors.push((field.name.clone(), format!("{} is required", field.label)));
                    continue;
                }
                if let Some(min) = field.min_len {
                    if !s.is_empty() && s.chars().count() < min {
                        errors.push((
                            field.name.clone(),
                            format!("{} must be at least {min} characters", field.label),
                        ));
                    }
                }
                if let Some(max) = field.max_len {
                    if s.chars().count() > max {
                        errors.push((
                            field.name.clone(),
                            format!("{} must be at most {max} characters", field.label),
                        ));
                    }
                }
            }
            (FieldKind::Number, Some(FieldValue::Text(s))) => {
                if s.is_empty() {
                    if field.required {
                        errors.push((field.name.clone(), format!("{} is required", field.label)));
                    }
                    continue;
                }
                match s.trim().parse::<i64>() {
                    Ok(n) => {
                        if let Some(min) = field.min {
                            if n < min {
                                errors.push((
                                    field.name.clone(),
                                    format!("{} must be at least {min}", field.label),
                                ));
                            }
                        }
                        if let Some(max) = field.max {
                            if n > max {
                                errors.push((
                                    field.name.clone(),
                                    format!("{} must be at most {max}", field.label),
                                ));
                            }
                        }
                    }
                    Err(_) => {
                        errors.push((
                            field.name.clone(),
                            format!("{} must be a number", field.label),
                        ));
                    }
                }
            }
            (FieldKind::Select(options), Some(FieldValue::Choice(i))) => {
                if *i as usize >= options.len() {
                    errors.push((
                        field.name.clone(),
                        format!("{} has no option {i}", field.label),
                    ));
                }
            }
            (FieldKind::Toggle, Some(FieldValue::Toggle(_))) => {}
            _ => {
                errors.push((field.name.clone(), format!("{} is missing", field.label)));
            }
        }
    }
    errors
}

/// Typed submission payload: numbers parsed, text passed through.
fn finalize(spec: &FormSpec, data: &FormData) -> FormData {
    let mut out = FormData::default();
    for field in &spec.fields {
        let value = match (data.get(&field.name), &field.kind) {
            (Some(FieldValue::Text(s)), FieldKind::Number) => {
                FieldValue::Number(s.trim().parse().unwrap_or(0))
            }
            (Some(v), _) => v.clone(),
            (None, _) => continue,
        };
        out.insert(field.name.clone(), value);
    }
    out
}

// =============================================================================
// Rendering
// =============================================================================

fn current_text(state: &FormState, name: &str) -> String {
    match state.value(name) {
        Some(FieldValue::Text(s)) => s,
        _ => String::new(),
    }
}

fn render_field(field: &FieldSpec, state: &FormState) {
    container().gap(2u16).children(|| {
        text(field.label.as_str())
            .font_size(12u16)
            .fg(ThemeToken::TextMuted)
            .end();
        match &field.kind {
            FieldKind::Text | FieldKind::Password | FieldKind::Number => {
                let writer = state.clone();
                input(current_text(state, &field.name))
                    .placeholder(field.label.as_str())
                    .on_event_ctx(
                        EventKind::Change,
                        move |name: &String, payload: &EventPayload| {
                            if let Some(value) = payload.as_text() {
                                writer.set_value(name, FieldValue::Text(value.to_string()));
                            }
                        },
                        field.name.clone(),
                    )
                    .end();
            }
            FieldKind::Toggle => {
                let on = matches!(state.value(&field.name), Some(FieldValue::Toggle(true)));
                let writer = state.clone();
                let flips_to = !on;
                button(if on { "on" } else { "off" })
                    .on_press_with(
                        move |name: &String, _payload| {
                            writer.set_value(name, FieldValue::Toggle(flips_to));
                        },
                        field.name.clone(),
                    )
                    .end();
            }
            FieldKind::Select(options) => {
                let selected = match state.value(&field.name) {
                    Some(FieldValue::Choice(i)) => i,
                    _ => 0,
                };
                let writer = state.clone();
                select(options.clone())
                    .selected(selected)
                    .on_event_ctx(
                        EventKind::Change,
                        move |name: &String, payload: &EventPayload| {
                            if let Some(text) = payload.as_text() {
                                if let Ok(choice) = text.parse::<u32>() {
                                    writer.set_value(name, FieldValue::Choice(choice));
                                }
                            }
                        },
                        field.name.clone(),
                    )
                    .end();
            }
        }
    });
}

/// Render a form described by `spec`: one input per field, field errors
/// underneath, and a submit button that validates before dispatching the
/// typed payload to `on_submit`.
///
/// Call inside a render root; state must outlive the render function.
pub fn form(spec: &Rc<FormSpec>, state: &FormState, on_submit: Rc<dyn Fn(&FormData)>) {
    container().gap(8u16).children(|| {
        for field in &spec.fields {
            keyed(field.name.clone(), || render_field(field, state));
        }

        for (field, message) in state.errors() {
            keyed(format!("err-{field}"), || {
                text(message)
                    .font_size(12u16)
                    .fg(ThemeToken::Error)
                    .attrs(Attr::ITALIC)
                    .end();
            });
        }

        let spec = Rc::clone(spec);
        let state = state.clone();
        button("Submit")
            .on_press(move |_payload| {
                let data = state.values.borrow().clone();
                let errors = validate(&spec, &data);
                let ok = errors.is_empty();
                *state.errors.borrow_mut() = errors;
                if ok {
                    on_submit(&finalize(&spec, &data));
                }
            })
            .end();
    });
}

// =============================================================================
// Tests
// =============================================================================
