use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::PricingSnapshot;
use crate::messaging::{
    keys, BrokerError, BrokerGateway, ChangedFields, Envelope, EnvelopeError, MessageKind,
    MessageTransport, PriceRequestBody, PriceResponseBody,
};
use crate::store::{PropertyFilter, PropertyPatch, PropertyStore, StoreError};

use super::broadcast::UpdateBroadcastPublisher;

/// Runs the price recommendation protocol: snapshot every property, ask the
/// analytics service, and fold the answers back in under each owner's
/// automation policy. Cycles are correlated by request id; a response that
/// does not match the latest outstanding request is dropped wholesale.
pub struct PriceOrchestrator<S, T> {
    store: Arc<S>,
    gateway: Arc<BrokerGateway<T>>,
    broadcast: Arc<UpdateBroadcastPublisher<T>>,
    outstanding: Mutex<Option<Uuid>>,
}

/// Outcome counters for one applied response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationSummary {
    /// Price and recommendation written, broadcast sent.
    pub applied: usize,
    /// Recommendation recorded for the owner to review; price untouched.
    pub noted: usize,
    /// Recommendations for ids no longer in the store.
    pub skipped: usize,
    /// Whole response discarded as an out-of-cycle straggler.
    pub stale: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl<S, T> PriceOrchestrator<S, T>
where
    S: PropertyStore + 'static,
    T: MessageTransport + 'static,
{
    pub fn new(
        store: Arc<S>,
        gateway: Arc<BrokerGateway<T>>,
        broadcast: Arc<UpdateBroadcastPublisher<T>>,
    ) -> Self {
        Self {
            store,
            gateway,
            broadcast,
            outstanding: Mutex::new(None),
        }
    }

    /// Snapshot every property and request recommendations. Returns the new
    /// request id, or `None` when the store is empty and nothing was sent.
    pub async fn request_recommendations(&self) -> Result<Option<Uuid>, PricingError> {
        let properties = self.store.find_many(PropertyFilter::all()).await?;
        if properties.is_empty() {
            debug!("no properties to price, skipping recommendation request");
            return Ok(None);
        }

        let request_id = Uuid::new_v4();
        let snapshots: Vec<PricingSnapshot> =
            properties.iter().map(PricingSnapshot::from_property).collect();
        let count = snapshots.len();

        let body = PriceRequestBody {
            request_id,
            snapshots,
        };
        let envelope = Envelope::new(MessageKind::GetRecommendedPrice, &body)?;
        self.gateway.publish(keys::PRICING_REQUEST, &envelope).await?;

        *self.outstanding.lock().expect("pricing mutex poisoned") = Some(request_id);

        info!(%request_id, properties = count, "requested price recommendations");
        Ok(Some(request_id))
    }

    /// Fold one analytics response into the store. Per pair: unknown ids are
    /// skipped; owners with automation on get the price applied atomically
    /// with the recommendation and one broadcast; everyone else gets the
    /// recommendation recorded for manual review.
    pub async fn apply_recommendations(
        &self,
        response: PriceResponseBody,
    ) -> Result<RecommendationSummary, PricingError> {
        let expected = *self.outstanding.lock().expect("pricing mutex poisoned");
        if expected != Some(response.request_id) {
            warn!(
                request_id = %response.request_id,
                "price response does not match the outstanding request, dropping"
            );
            return Ok(RecommendationSummary {
                stale: true,
                ..RecommendationSummary::default()
            });
        }

        let mut summary = RecommendationSummary::default();

        for (property_id, recommended) in response.prices {
            let found = self
                .store
                .find_one(PropertyFilter::by_id(property_id.clone()))
                .await?;

            let Some(property) = found else {
                // Deleted between request and response; benign.
                debug!(%property_id, "recommendation for unknown property, skipping");
                summary.skipped += 1;
                continue;
            };

            let auto_apply = property.update_price_automatically
                && (recommended - property.price).abs() > f64::EPSILON;

            if auto_apply {
                let updated = self
                    .store
                    .update_one(
                        PropertyFilter::by_id(property_id.clone()),
                        PropertyPatch::new()
                            .price(recommended)
                            .recommended_price(recommended),
                    )
                    .await?;

                if let Some(updated) = updated {
                    let fields =
                        ChangedFields::new().price(updated.price, updated.after_commission);
                    self.broadcast.publish_update(updated.id, fields).await?;
                    summary.applied += 1;
                } else {
                    summary.skipped += 1;
                }
            } else {
                self.store
                    .update_one(
                        PropertyFilter::by_id(property_id),
                        PropertyPatch::new().recommended_price(recommended),
                    )
                    .await?;
                summary.noted += 1;
            }
        }

        info!(
            applied = summary.applied,
            noted = summary.noted,
            skipped = summary.skipped,
            "applied price recommendations"
        );
        Ok(summary)
    }
}
