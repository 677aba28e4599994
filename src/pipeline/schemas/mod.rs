//! Typed schemas for the fixed catalog of accepted events.
//!
//! Each schema deserializes the raw inbound body, checks every field-level
//! constraint, and resolves defaults and derived fields in a single pass,
//! producing either a fully-resolved event or the complete list of
//! violations (field path + reason).

use std::fmt;

use validator::{ValidationErrors, ValidationErrorsKind};

pub mod generic;
pub mod keycard;
pub mod registration;

pub use generic::{IdentifyBody, TrackBody};
pub use keycard::{CheckInEvent, Direction, EntryReason, GymEntryBody, GymEntryVariant};
pub use registration::{
    ContractEvent, MemberProfile, NewMemberContractBody, UserIdentifyBody,
};

/// Delivery semantics of an event: an action occurred (`track`) or subject
/// attributes were updated (`identify`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Track,
    Identify,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Track => "track",
            EventKind::Identify => "identify",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violated constraint, addressed by its field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Flattens nested `validator` errors into dotted field paths, so derive
/// checks and hand-written cross-field checks land in one violation list.
///
/// Paths are reported in the wire casing the caller sent (`userId`, not
/// `user_id`).
pub fn flatten_validation_errors(errors: &ValidationErrors, prefix: &str) -> Vec<FieldViolation> {
    let mut out = Vec::new();
    collect(errors, prefix, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Maps a Rust field name to the wire name. The ingestion API uses camelCase
/// throughout except `country_alpha2`, which it keeps snake_case.
fn wire_segment(field: &str) -> String {
    if field == "country_alpha2" {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let segment = wire_segment(field.as_ref());
        let path = if prefix.is_empty() {
            segment
        } else {
            format!("{prefix}.{segment}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let reason = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push(FieldViolation::new(path.clone(), reason));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
