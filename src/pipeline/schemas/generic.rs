//! Generic pass-through bodies for the `/track` and `/identify` routes.
//!
//! These carry caller-shaped property bags verbatim; validation only covers
//! presence and basic shape.

use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use super::{flatten_validation_errors, FieldViolation};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackBody {
    #[serde(rename = "userId")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(rename = "anonymousId")]
    pub anonymous_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IdentifyBody {
    #[serde(rename = "userId")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub user_id: String,
    pub traits: Map<String, Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(rename = "anonymousId")]
    pub anonymous_id: Option<String>,
}

fn context_is_object(context: &Option<Value>) -> Option<FieldViolation> {
    match context {
        Some(value) if !value.is_object() => {
            Some(FieldViolation::new("context", "must be an object"))
        }
        _ => None,
    }
}

impl TrackBody {
    pub fn validated(self) -> Result<Self, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => flatten_validation_errors(&errors, ""),
        };
        violations.extend(context_is_object(&self.context));
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(violations)
        }
    }
}

impl IdentifyBody {
    pub fn validated(self) -> Result<Self, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => flatten_validation_errors(&errors, ""),
        };
        violations.extend(context_is_object(&self.context));
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(violations)
        }
    }
}
