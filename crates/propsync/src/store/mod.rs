mod memory;

pub use memory::InMemoryPropertyStore;

use async_trait::async_trait;

use crate::domain::{
    normalized_address, normalized_owner, NewProperty, Property, PropertyId, ServiceTag,
};

/// Filter over canonical property records. Fields combine conjunctively; an
/// empty filter matches everything. Owner and address comparisons use the
/// normalized key forms, matching the store's unique index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub id: Option<PropertyId>,
    pub owner_email: Option<String>,
    pub address: Option<String>,
}

impl PropertyFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: PropertyId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_owner(owner_email: impl Into<String>) -> Self {
        Self {
            owner_email: Some(owner_email.into()),
            ..Self::default()
        }
    }

    pub fn by_owner_address(owner_email: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: None,
            owner_email: Some(owner_email.into()),
            address: Some(address.into()),
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        if let Some(id) = &self.id {
            if *id != property.id {
                return false;
            }
        }
        if let Some(owner) = &self.owner_email {
            if normalized_owner(owner) != normalized_owner(&property.owner_email) {
                return false;
            }
        }
        if let Some(address) = &self.address {
            if normalized_address(address) != normalized_address(&property.address) {
                return false;
            }
        }
        true
    }
}

/// Partial update applied to a single record. Unset fields are left alone;
/// `add_service` has set semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub recommended_price: Option<f64>,
    pub update_price_automatically: Option<bool>,
    pub after_commission: Option<bool>,
    pub add_service: Option<ServiceTag>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn recommended_price(mut self, price: f64) -> Self {
        self.recommended_price = Some(price);
        self
    }

    pub fn update_price_automatically(mut self, enabled: bool) -> Self {
        self.update_price_automatically = Some(enabled);
        self
    }

    pub fn after_commission(mut self, enabled: bool) -> Self {
        self.after_commission = Some(enabled);
        self
    }

    pub fn add_service(mut self, service: ServiceTag) -> Self {
        self.add_service = Some(service);
        self
    }

    pub fn apply(&self, property: &mut Property) {
        if let Some(title) = &self.title {
            property.title = title.clone();
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(recommended) = self.recommended_price {
            property.recommended_price = Some(recommended);
        }
        if let Some(enabled) = self.update_price_automatically {
            property.update_price_automatically = enabled;
        }
        if let Some(enabled) = self.after_commission {
            property.after_commission = enabled;
        }
        if let Some(service) = &self.add_service {
            property.services.insert(service.clone());
        }
    }
}

/// Outcome of an insert-if-absent against the (owner, address) unique index.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// No record held the key; the new property was stored.
    Created(Property),
    /// A canonical record already held the key; nothing was written.
    Existing(Property),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a property for '{owner_email}' at '{address}' already exists")]
    DuplicateKey {
        owner_email: String,
        address: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Document-store collaborator seam. Implementations must enforce a unique
/// index on the normalized (owner, address) pair so `insert_unique` is atomic
/// under concurrent imports.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn find_one(&self, filter: PropertyFilter) -> Result<Option<Property>, StoreError>;

    async fn find_many(&self, filter: PropertyFilter) -> Result<Vec<Property>, StoreError>;

    /// Plain insert; fails with [`StoreError::DuplicateKey`] on a key clash.
    async fn insert_one(&self, property: NewProperty) -> Result<Property, StoreError>;

    /// Insert-if-absent on the unique key, reporting which side won.
    async fn insert_unique(&self, property: NewProperty) -> Result<InsertOutcome, StoreError>;

    /// Patch the first matching record and return the updated document, or
    /// `None` when nothing matched.
    async fn update_one(
        &self,
        filter: PropertyFilter,
        patch: PropertyPatch,
    ) -> Result<Option<Property>, StoreError>;

    /// Remove the first matching record; `true` when something was deleted.
    async fn delete_one(&self, filter: PropertyFilter) -> Result<bool, StoreError>;

    async fn count(&self, filter: PropertyFilter) -> Result<u64, StoreError>;
}
