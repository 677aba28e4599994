//! Member registration schemas: the identify profile for a new member and
//! the signup contract track event.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{flatten_validation_errors, FieldViolation};
use crate::pipeline::derive;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct Address {
    #[serde(rename = "zipCode")]
    pub zip_code: String,
    pub state: String,
    #[validate(length(equal = 2, message = "must be a 2-letter country code"))]
    pub country_alpha2: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserTraits {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub birthday: Option<NaiveDate>,
    #[validate(length(equal = 1, message = "must be a single character"))]
    pub gender: String,
    pub age: Option<i32>,
    #[validate(nested)]
    pub address: Address,
    pub phone: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw inbound body for `/user/register/new-member`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserIdentifyBody {
    #[serde(rename = "type", default = "identify_literal")]
    pub kind: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[validate(nested)]
    pub traits: UserTraits,
}

fn identify_literal() -> String {
    "identify".to_string()
}

/// A validated member profile with age and `createdAt` resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: String,
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: NaiveDate,
    pub gender: String,
    pub age: i32,
    pub address: Address,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl UserIdentifyBody {
    /// Checks every constraint, derives `age` from `birthday` when omitted,
    /// and fills the `createdAt` default. `today`/`now` are passed in so the
    /// resolution stays deterministic under test.
    pub fn validate_and_resolve(
        self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<MemberProfile, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => flatten_validation_errors(&errors, ""),
        };

        if self.kind != "identify" {
            violations.push(FieldViolation::new("type", "must be \"identify\""));
        }

        match self.traits.birthday {
            Some(birthday) if violations.is_empty() => {
                let age = self
                    .traits
                    .age
                    .unwrap_or_else(|| derive::age_on(today, birthday));

                Ok(MemberProfile {
                    user_id: self.user_id,
                    id: self.traits.id,
                    first_name: self.traits.first_name,
                    last_name: self.traits.last_name,
                    email: self.traits.email,
                    birthday,
                    gender: self.traits.gender,
                    age,
                    address: self.traits.address,
                    phone: self.traits.phone,
                    created_at: self.traits.created_at.unwrap_or(now),
                })
            }
            Some(_) => Err(violations),
            None => {
                // Required outright, and age derivation depends on it.
                violations.push(FieldViolation::new(
                    "traits.birthday",
                    "birthday is required",
                ));
                Err(violations)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractProperties {
    #[serde(rename = "tarifName")]
    pub tarif_name: String,
    #[serde(rename = "tarifFee")]
    pub tarif_fee: f64,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FreeformContext {
    #[serde(default)]
    pub device: BTreeMap<String, Value>,
}

/// Raw inbound body for `/user/register/new-contract`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMemberContractBody {
    #[serde(rename = "type", default = "track_literal")]
    pub kind: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default = "contract_event_literal")]
    pub event: String,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "must be a 3-letter currency code"))]
    pub currency: String,
    pub properties: ContractProperties,
    #[serde(default)]
    pub context: FreeformContext,
}

fn track_literal() -> String {
    "track".to_string()
}

fn contract_event_literal() -> String {
    "signup_contract_created".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// A validated signup contract with `startDate` and `currency` resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEvent {
    pub user_id: String,
    pub event: String,
    pub currency: String,
    pub tarif_name: String,
    pub tarif_fee: f64,
    pub start_date: NaiveDate,
    pub device: BTreeMap<String, Value>,
}

impl NewMemberContractBody {
    pub fn validate_and_resolve(
        self,
        today: NaiveDate,
    ) -> Result<ContractEvent, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => flatten_validation_errors(&errors, ""),
        };

        if self.kind != "track" {
            violations.push(FieldViolation::new("type", "must be \"track\""));
        }
        if self.event != "signup_contract_created" {
            violations.push(FieldViolation::new(
                "event",
                "must be \"signup_contract_created\"",
            ));
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(ContractEvent {
            user_id: self.user_id,
            event: self.event,
            currency: self.currency,
            tarif_name: self.properties.tarif_name,
            tarif_fee: self.properties.tarif_fee,
            start_date: self.properties.start_date.unwrap_or(today),
            device: self.context.device,
        })
    }
}
