use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{ImportedProperty, PropertyId, ServiceTag};
use crate::messaging::{
    keys, BrokerError, BrokerGateway, DuplicateImportBody, Envelope, EnvelopeError, MessageKind,
    MessageTransport, ReservationImportBody,
};
use crate::store::{InsertOutcome, PropertyFilter, PropertyPatch, PropertyStore, StoreError};

/// Folds wrapper import batches into the canonical store. Duplicate
/// detection rides on the store's (owner, address) unique key, so two
/// concurrent imports of the same listing race safely: one creates, the
/// other merges.
pub struct ReconciliationEngine<S, T> {
    store: Arc<S>,
    gateway: Arc<BrokerGateway<T>>,
}

/// Per-batch outcome: counters for logging plus the identifier map shipped
/// back to the originating wrapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub created: usize,
    pub merged: usize,
    pub id_map: BTreeMap<String, PropertyId>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl<S, T> ReconciliationEngine<S, T>
where
    S: PropertyStore + 'static,
    T: MessageTransport + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<BrokerGateway<T>>) -> Self {
        Self { store, gateway }
    }

    /// Import one wrapper batch. Records are processed in arrival order;
    /// after the last record, exactly one reservation remap message goes
    /// back to the wrapper, even when the map is empty.
    pub async fn import_batch(
        &self,
        service: ServiceTag,
        records: Vec<ImportedProperty>,
    ) -> Result<ImportSummary, ReconcileError> {
        if records.is_empty() {
            debug!(service = %service, "empty import batch");
            return Ok(ImportSummary::default());
        }

        let owner_email = records[0].owner_email.clone();
        let mut summary = ImportSummary::default();

        for record in records {
            let outcome = self
                .store
                .insert_unique(record.clone().into_new(service.clone()))
                .await?;

            match outcome {
                InsertOutcome::Created(property) => {
                    summary.created += 1;
                    if record.id != property.id.0 {
                        summary.id_map.insert(record.id, property.id);
                    }
                }
                InsertOutcome::Existing(canonical) => {
                    summary.merged += 1;
                    self.merge_duplicate(&service, record, &canonical, &mut summary)
                        .await?;
                }
            }
        }

        let body = ReservationImportBody {
            owner_email,
            id_map: summary.id_map.clone(),
        };
        let envelope = Envelope::new(MessageKind::ReservationImportInitialRequest, &body)?;
        self.gateway
            .publish(&keys::reservations_for(&service), &envelope)
            .await?;

        info!(
            service = %service,
            created = summary.created,
            merged = summary.merged,
            remapped = summary.id_map.len(),
            "imported batch"
        );
        Ok(summary)
    }

    /// A record collided with an existing canonical property: re-point the
    /// wrapper id, tell the wrapper, and make sure the canonical record
    /// lists this service. Same-id re-imports are a pure no-op.
    async fn merge_duplicate(
        &self,
        service: &ServiceTag,
        record: ImportedProperty,
        canonical: &crate::domain::Property,
        summary: &mut ImportSummary,
    ) -> Result<(), ReconcileError> {
        if record.id != canonical.id.0 {
            summary
                .id_map
                .insert(record.id.clone(), canonical.id.clone());

            let body = DuplicateImportBody {
                imported: record,
                canonical: canonical.clone(),
            };
            let envelope = Envelope::new(MessageKind::DuplicateImportProperty, &body)?;
            self.gateway
                .publish(&keys::duplicates_for(service), &envelope)
                .await?;
        }

        if !canonical.has_service(service) {
            self.store
                .update_one(
                    PropertyFilter::by_id(canonical.id.clone()),
                    PropertyPatch::new().add_service(service.clone()),
                )
                .await?;
        }
        Ok(())
    }
}
