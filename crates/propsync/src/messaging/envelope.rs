use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AnalyticsSnapshot, ImportedProperty, PricingSnapshot, Property, PropertyId, ServiceTag,
};

/// Closed set of message kinds on the exchange. The dispatcher matches on
/// this exhaustively, so adding a kind forces every consumer arm to be
/// revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    PropertyImportResponse,
    ReservationImportInitialRequest,
    DuplicateImportProperty,
    PropertyUpdate,
    GetRecommendedPrice,
    RecommendedPriceResponse,
    SendDataToAnalytics,
}

impl MessageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::PropertyImportResponse => "PROPERTY_IMPORT_RESPONSE",
            MessageKind::ReservationImportInitialRequest => "RESERVATION_IMPORT_INITIAL_REQUEST",
            MessageKind::DuplicateImportProperty => "DUPLICATE_IMPORT_PROPERTY",
            MessageKind::PropertyUpdate => "PROPERTY_UPDATE",
            MessageKind::GetRecommendedPrice => "GET_RECOMMENDED_PRICE",
            MessageKind::RecommendedPriceResponse => "RECOMMENDED_PRICE_RESPONSE",
            MessageKind::SendDataToAnalytics => "SEND_DATA_TO_ANALYTICS",
        }
    }
}

/// Wire envelope: a kind tag plus the uninterpreted JSON body. Bodies are
/// decoded per kind after routing; envelopes are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: MessageKind,
    pub body: serde_json::Value,
}

impl Envelope {
    pub fn new<T: Serialize>(kind: MessageKind, body: &T) -> Result<Self, EnvelopeError> {
        let body = serde_json::to_value(body).map_err(|source| EnvelopeError::Encode {
            kind: kind.as_str(),
            source,
        })?;
        Ok(Self { kind, body })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|source| EnvelopeError::Encode {
            kind: self.kind.as_str(),
            source,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|source| EnvelopeError::Decode { source })
    }

    /// Decode the body into the typed shape for this kind.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        serde_json::from_value(self.body.clone()).map_err(|source| EnvelopeError::Body {
            kind: self.kind.as_str(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("failed to encode {kind} envelope: {source}")]
    Encode {
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error("malformed envelope: {source}")]
    Decode { source: serde_json::Error },
    #[error("malformed {kind} body: {source}")]
    Body {
        kind: &'static str,
        source: serde_json::Error,
    },
}

/// Body of `PROPERTY_IMPORT_RESPONSE`: one wrapper's batch of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyImportBody {
    pub service: ServiceTag,
    pub properties: Vec<ImportedProperty>,
}

/// Body of `RESERVATION_IMPORT_INITIAL_REQUEST`: tells the originating
/// wrapper which of its record ids were re-pointed at canonical ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationImportBody {
    pub owner_email: String,
    pub id_map: BTreeMap<String, PropertyId>,
}

/// Body of `DUPLICATE_IMPORT_PROPERTY`: the record that lost the merge and
/// the canonical record it folded into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateImportBody {
    pub imported: ImportedProperty,
    pub canonical: Property,
}

/// Body of `PROPERTY_UPDATE`, broadcast to every wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdateBody {
    pub property_id: PropertyId,
    pub changed_fields: ChangedFields,
}

/// Body of `GET_RECOMMENDED_PRICE`. The request id correlates the response;
/// stale responses are dropped by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRequestBody {
    pub request_id: Uuid,
    pub snapshots: Vec<PricingSnapshot>,
}

/// Body of `RECOMMENDED_PRICE_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResponseBody {
    pub request_id: Uuid,
    pub prices: BTreeMap<PropertyId, f64>,
}

/// Body of `SEND_DATA_TO_ANALYTICS`: one batched export per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsBody {
    pub snapshots: Vec<AnalyticsSnapshot>,
}

/// Ordered field-name to value map carried by an update broadcast. The only
/// way to record a price change is [`ChangedFields::price`], which writes the
/// commission flag alongside it, so listeners can always interpret the
/// number they receive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedFields(BTreeMap<String, serde_json::Value>);

impl ChangedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.0
            .insert("title".to_string(), serde_json::Value::from(title));
        self
    }

    pub fn price(mut self, price: f64, after_commission: bool) -> Self {
        self.0
            .insert("price".to_string(), serde_json::Value::from(price));
        self.0.insert(
            "after_commission".to_string(),
            serde_json::Value::from(after_commission),
        );
        self
    }

    pub fn recommended_price(mut self, price: f64) -> Self {
        self.0.insert(
            "recommended_price".to_string(),
            serde_json::Value::from(price),
        );
        self
    }

    pub fn field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
