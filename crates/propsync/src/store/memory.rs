use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{normalized_address, normalized_owner, NewProperty, Property, PropertyId};

use super::{InsertOutcome, PropertyFilter, PropertyPatch, PropertyStore, StoreError};

/// In-memory store used by tests, the demo command, and single-process runs.
/// One mutex guards the records, the unique index, and the id sequence, so
/// `insert_unique` is atomic under concurrent imports.
#[derive(Default, Clone)]
pub struct InMemoryPropertyStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    sequence: u64,
    records: BTreeMap<PropertyId, Property>,
    unique: HashMap<(String, String), PropertyId>,
}

impl StoreInner {
    fn next_id(&mut self) -> PropertyId {
        self.sequence += 1;
        PropertyId(format!("prop-{:06}", self.sequence))
    }

    fn store_new(&mut self, property: NewProperty, key: (String, String)) -> Property {
        let id = self.next_id();
        let stored = property.into_property(id.clone());
        self.unique.insert(key, id.clone());
        self.records.insert(id, stored.clone());
        stored
    }

    fn existing_for_key(&self, key: &(String, String)) -> Option<Property> {
        self.unique
            .get(key)
            .and_then(|id| self.records.get(id))
            .cloned()
    }
}

fn unique_key(owner_email: &str, address: &str) -> (String, String) {
    (normalized_owner(owner_email), normalized_address(address))
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn find_one(&self, filter: PropertyFilter) -> Result<Option<Property>, StoreError> {
        let inner = self.inner.lock().expect("property store mutex poisoned");
        Ok(inner
            .records
            .values()
            .find(|property| filter.matches(property))
            .cloned())
    }

    async fn find_many(&self, filter: PropertyFilter) -> Result<Vec<Property>, StoreError> {
        let inner = self.inner.lock().expect("property store mutex poisoned");
        Ok(inner
            .records
            .values()
            .filter(|property| filter.matches(property))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, property: NewProperty) -> Result<Property, StoreError> {
        let mut inner = self.inner.lock().expect("property store mutex poisoned");
        let key = unique_key(&property.owner_email, &property.address);
        if inner.existing_for_key(&key).is_some() {
            return Err(StoreError::DuplicateKey {
                owner_email: property.owner_email,
                address: property.address,
            });
        }
        Ok(inner.store_new(property, key))
    }

    async fn insert_unique(&self, property: NewProperty) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.lock().expect("property store mutex poisoned");
        let key = unique_key(&property.owner_email, &property.address);
        if let Some(existing) = inner.existing_for_key(&key) {
            return Ok(InsertOutcome::Existing(existing));
        }
        Ok(InsertOutcome::Created(inner.store_new(property, key)))
    }

    async fn update_one(
        &self,
        filter: PropertyFilter,
        patch: PropertyPatch,
    ) -> Result<Option<Property>, StoreError> {
        let mut inner = self.inner.lock().expect("property store mutex poisoned");
        let target = inner
            .records
            .values()
            .find(|property| filter.matches(property))
            .map(|property| property.id.clone());

        let Some(id) = target else {
            return Ok(None);
        };

        let Some(record) = inner.records.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(record);
        Ok(Some(record.clone()))
    }

    async fn delete_one(&self, filter: PropertyFilter) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("property store mutex poisoned");
        let target = inner
            .records
            .values()
            .find(|property| filter.matches(property))
            .map(|property| property.id.clone());

        let Some(id) = target else {
            return Ok(false);
        };

        if let Some(removed) = inner.records.remove(&id) {
            let key = unique_key(&removed.owner_email, &removed.address);
            inner.unique.remove(&key);
        }
        Ok(true)
    }

    async fn count(&self, filter: PropertyFilter) -> Result<u64, StoreError> {
        let inner = self.inner.lock().expect("property store mutex poisoned");
        Ok(inner
            .records
            .values()
            .filter(|property| filter.matches(property))
            .count() as u64)
    }
}
