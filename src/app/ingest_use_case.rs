//! Use case orchestrating the pipeline for every accepted event: validate,
//! enrich, normalize, deliver once, map the outcome.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::app::ports::{DeliveryAck, DeliveryPort};
use crate::error::{GatewayError, Result};
use crate::pipeline::enrich::RequestMeta;
use crate::pipeline::normalize::{self, NormalizedPayload};
use crate::pipeline::schemas::{
    GymEntryBody, GymEntryVariant, IdentifyBody, NewMemberContractBody, TrackBody,
    UserIdentifyBody,
};

pub struct IngestUseCase {
    delivery: Arc<dyn DeliveryPort>,
}

impl IngestUseCase {
    pub fn new(delivery: Arc<dyn DeliveryPort>) -> Self {
        Self { delivery }
    }

    /// Single bounded external call; a failure is reported, never retried.
    async fn deliver(&self, payload: NormalizedPayload) -> Result<DeliveryAck> {
        match self.delivery.deliver(payload.kind, &payload.body).await {
            Ok(ack) => {
                info!(kind = %payload.kind, message_id = %ack.message_id, "event delivered");
                Ok(ack)
            }
            Err(failure) => {
                warn!(kind = %payload.kind, %failure, "delivery failed");
                Err(GatewayError::Delivery(failure))
            }
        }
    }

    pub async fn check_in(
        &self,
        variant: GymEntryVariant,
        body: GymEntryBody,
        meta: RequestMeta,
    ) -> Result<DeliveryAck> {
        let event = body
            .validate_and_resolve(variant)
            .map_err(GatewayError::Validation)?;
        self.deliver(normalize::check_in(&event, &meta)).await
    }

    pub async fn register_member(
        &self,
        body: UserIdentifyBody,
        meta: RequestMeta,
    ) -> Result<DeliveryAck> {
        let now = Utc::now();
        let profile = body
            .validate_and_resolve(now.date_naive(), now)
            .map_err(GatewayError::Validation)?;
        self.deliver(normalize::member_profile(&profile, &meta, now))
            .await
    }

    pub async fn register_contract(
        &self,
        body: NewMemberContractBody,
        meta: RequestMeta,
    ) -> Result<DeliveryAck> {
        let now = Utc::now();
        let event = body
            .validate_and_resolve(now.date_naive())
            .map_err(GatewayError::Validation)?;
        self.deliver(normalize::contract(&event, &meta, now)).await
    }

    pub async fn track(&self, body: TrackBody, meta: RequestMeta) -> Result<DeliveryAck> {
        let body = body.validated().map_err(GatewayError::Validation)?;
        self.deliver(normalize::track(&body, &meta, Utc::now()))
            .await
    }

    pub async fn identify(&self, body: IdentifyBody, meta: RequestMeta) -> Result<DeliveryAck> {
        let body = body.validated().map_err(GatewayError::Validation)?;
        self.deliver(normalize::identify(&body, &meta, Utc::now()))
            .await
    }

    /// Demo scaffolding for `/user/register/sample`: a fixed profile pushed
    /// through the regular identify pipeline.
    pub async fn sample(&self, meta: RequestMeta) -> Result<DeliveryAck> {
        let body: UserIdentifyBody = serde_json::from_value(json!({
            "type": "identify",
            "userId": "B0027-14602",
            "traits": {
                "id": "B0027-14602",
                "firstName": "Kaye",
                "lastName": "Kua",
                "email": "example@gmail.com",
                "birthday": "2000-12-25",
                "gender": "F",
                "address": {
                    "zipCode": "10117",
                    "state": "Berlin",
                    "country_alpha2": "DE"
                },
                "phone": "+4901234567"
            }
        }))?;
        self.register_member(body, meta).await
    }
}
