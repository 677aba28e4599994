//! Normalization: the deterministic mapping from a validated event plus
//! enrichment inputs to the exact outbound payload shape.
//!
//! Key casing is a strict compatibility requirement of the ingestion API
//! (`userId`, not `user_id`), so every outbound key is spelled out here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::enrich::{self, RequestMeta};
use super::schemas::{
    CheckInEvent, ContractEvent, EventKind, IdentifyBody, MemberProfile, TrackBody,
};

/// The outbound payload handed to the delivery port. Ephemeral; built fresh
/// per request and discarded after delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub kind: EventKind,
    pub body: Value,
}

fn iso_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn check_in(event: &CheckInEvent, meta: &RequestMeta) -> NormalizedPayload {
    let device = json!({
        "cardReaderId": event.device.card_reader_id,
        "branchId": event.device.branch_id,
        "branchName": event.device.branch_name,
    });

    NormalizedPayload {
        kind: EventKind::Track,
        body: json!({
            "userId": event.user_id,
            "type": "track",
            "event": event.variant.event_name(),
            "properties": {
                "cardId": event.card_id,
                "reason": event.reason.as_str(),
                "direction": event.direction.as_str(),
            },
            "context": enrich::device_nested_context(device, meta),
            "timestamp": iso_utc(event.timestamp),
        }),
    }
}

pub fn member_profile(
    profile: &MemberProfile,
    meta: &RequestMeta,
    now: DateTime<Utc>,
) -> NormalizedPayload {
    NormalizedPayload {
        kind: EventKind::Identify,
        body: json!({
            "userId": profile.user_id,
            "type": "identify",
            "traits": {
                "id": profile.id,
                "firstName": profile.first_name,
                "lastName": profile.last_name,
                "email": profile.email,
                "birthday": profile.birthday.to_string(),
                "gender": profile.gender,
                "age": profile.age,
                "address": {
                    "zipCode": profile.address.zip_code,
                    "state": profile.address.state,
                    "country_alpha2": profile.address.country_alpha2,
                },
                "phone": profile.phone,
                "createdAt": iso_utc(profile.created_at),
            },
            "context": enrich::flat_context(None, meta),
            "timestamp": iso_utc(now),
        }),
    }
}

pub fn contract(event: &ContractEvent, meta: &RequestMeta, now: DateTime<Utc>) -> NormalizedPayload {
    NormalizedPayload {
        kind: EventKind::Track,
        body: json!({
            "userId": event.user_id,
            "type": "track",
            "event": event.event,
            "properties": {
                "tarifName": event.tarif_name,
                "tarifFee": event.tarif_fee,
                "currency": event.currency,
                "startDate": event.start_date.to_string(),
            },
            "context": enrich::device_nested_context(
                enrich::contract_device(&event.device, meta),
                meta,
            ),
            "timestamp": iso_utc(now),
        }),
    }
}

pub fn track(body: &TrackBody, meta: &RequestMeta, now: DateTime<Utc>) -> NormalizedPayload {
    let mut out = Map::new();
    out.insert("userId".to_string(), json!(body.user_id));
    out.insert("type".to_string(), json!("track"));
    out.insert("event".to_string(), json!(body.event));
    out.insert(
        "properties".to_string(),
        Value::Object(body.properties.clone()),
    );
    out.insert(
        "context".to_string(),
        enrich::flat_context(body.context.as_ref(), meta),
    );
    out.insert("timestamp".to_string(), json!(iso_utc(now)));
    // Passed through untouched when present, never synthesized
    if let Some(anonymous_id) = &body.anonymous_id {
        out.insert("anonymousId".to_string(), json!(anonymous_id));
    }

    NormalizedPayload {
        kind: EventKind::Track,
        body: Value::Object(out),
    }
}

pub fn identify(body: &IdentifyBody, meta: &RequestMeta, now: DateTime<Utc>) -> NormalizedPayload {
    let mut out = Map::new();
    out.insert("userId".to_string(), json!(body.user_id));
    out.insert("type".to_string(), json!("identify"));
    out.insert("traits".to_string(), Value::Object(body.traits.clone()));
    out.insert(
        "context".to_string(),
        enrich::flat_context(body.context.as_ref(), meta),
    );
    out.insert("timestamp".to_string(), json!(iso_utc(now)));
    if let Some(anonymous_id) = &body.anonymous_id {
        out.insert("anonymousId".to_string(), json!(anonymous_id));
    }

    NormalizedPayload {
        kind: EventKind::Identify,
        body: Value::Object(out),
    }
}
