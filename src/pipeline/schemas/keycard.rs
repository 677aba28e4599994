//! Gym check-in event schemas: entry granted and entry denied.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{flatten_validation_errors, FieldViolation};

/// Reason attached to a check-in. Which values are acceptable depends on the
/// concrete variant: `ActiveMember` only ever accompanies a granted entry,
/// the rest only a denied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    ActiveMember,
    InsufficientMembershipTier,
    ExpiredMembership,
    IdleMembership,
}

impl EntryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryReason::ActiveMember => "active_member",
            EntryReason::InsufficientMembershipTier => "insufficient_membership_tier",
            EntryReason::ExpiredMembership => "expired_membership",
            EntryReason::IdleMembership => "idle_membership",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// The two concrete gym entry schemas, selected by route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GymEntryVariant {
    Granted,
    Denied,
}

impl GymEntryVariant {
    pub fn event_name(&self) -> &'static str {
        match self {
            GymEntryVariant::Granted => "gym_entry_granted",
            GymEntryVariant::Denied => "gym_entry_denied",
        }
    }

    /// The variant-specific closed reason set.
    pub fn allows(&self, reason: EntryReason) -> bool {
        match self {
            GymEntryVariant::Granted => matches!(reason, EntryReason::ActiveMember),
            GymEntryVariant::Denied => !matches!(reason, EntryReason::ActiveMember),
        }
    }

    fn allowed_reasons(&self) -> &'static str {
        match self {
            GymEntryVariant::Granted => "active_member",
            GymEntryVariant::Denied => {
                "insufficient_membership_tier, expired_membership, idle_membership"
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GymEntryProperties {
    #[serde(rename = "cardId")]
    pub card_id: String,
    pub reason: EntryReason,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GymEntryContext {
    #[serde(default)]
    pub device: BTreeMap<String, String>,
}

/// Raw inbound body for both check-in routes.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GymEntryBody {
    #[serde(rename = "userId")]
    #[validate(length(min = 5, message = "must be at least 5 characters"))]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub properties: GymEntryProperties,
    pub context: GymEntryContext,
    pub timestamp: DateTime<Utc>,
}

/// Card reader identification forwarded downstream. `cardReaderId` is
/// required; branch fields fall back to empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub card_reader_id: String,
    pub branch_id: String,
    pub branch_name: String,
}

/// A fully validated and resolved check-in, ready for normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInEvent {
    pub variant: GymEntryVariant,
    pub user_id: String,
    pub card_id: String,
    pub reason: EntryReason,
    pub direction: Direction,
    pub device: DeviceInfo,
    pub timestamp: DateTime<Utc>,
}

impl GymEntryBody {
    /// Checks every constraint and resolves device defaults in one pass,
    /// returning either the typed event or all violations found.
    pub fn validate_and_resolve(
        self,
        variant: GymEntryVariant,
    ) -> Result<CheckInEvent, Vec<FieldViolation>> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => flatten_validation_errors(&errors, ""),
        };

        if self.kind != "track" {
            violations.push(FieldViolation::new("type", "must be \"track\""));
        }
        if self.event != variant.event_name() {
            violations.push(FieldViolation::new(
                "event",
                format!("must be \"{}\"", variant.event_name()),
            ));
        }
        if !variant.allows(self.properties.reason) {
            violations.push(FieldViolation::new(
                "properties.reason",
                format!(
                    "\"{}\" is not valid for {}; expected one of: {}",
                    self.properties.reason.as_str(),
                    variant.event_name(),
                    variant.allowed_reasons()
                ),
            ));
        }

        let card_reader_id = match self.context.device.get("cardReaderId") {
            Some(id) => id.clone(),
            None => {
                violations.push(FieldViolation::new(
                    "context.device.cardReaderId",
                    "is required",
                ));
                String::new()
            }
        };

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(CheckInEvent {
            variant,
            user_id: self.user_id,
            card_id: self.properties.card_id,
            reason: self.properties.reason,
            direction: self.properties.direction,
            device: DeviceInfo {
                card_reader_id,
                branch_id: self
                    .context
                    .device
                    .get("branchId")
                    .cloned()
                    .unwrap_or_default(),
                branch_name: self
                    .context
                    .device
                    .get("branchName")
                    .cloned()
                    .unwrap_or_default(),
            },
            timestamp: self.timestamp,
        })
    }
}
