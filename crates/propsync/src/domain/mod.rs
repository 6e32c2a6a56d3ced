mod features;
mod snapshot;

pub use features::{
    Amenity, Bathroom, BathroomFixture, Bed, BedKind, Bedroom, Contact, HouseRules, TimeSlot,
};
pub use snapshot::{AnalyticsSnapshot, PricingSnapshot};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for canonical property records. Generated by the store
/// on insert; wrapper-local identifiers never become canonical ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased tag naming the wrapper service a record arrived through
/// ("zooking", "earthstayz", ...). Used as a routing-key segment, so it is
/// normalized on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ServiceTag(String);

impl ServiceTag {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ServiceTag {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical property record. At most one exists per (owner, address) pair;
/// wrapper imports that collide are merged into the existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_email: String,
    pub title: String,
    pub address: String,
    pub description: String,
    pub number_guests: u32,
    pub square_meters: u32,
    pub bedrooms: BTreeMap<String, Bedroom>,
    pub bathrooms: BTreeMap<String, Bathroom>,
    pub amenities: BTreeSet<Amenity>,
    pub house_rules: HouseRules,
    pub additional_info: String,
    pub cancellation_policy: String,
    pub contacts: Vec<Contact>,
    pub price: f64,
    pub recommended_price: Option<f64>,
    pub update_price_automatically: bool,
    pub after_commission: bool,
    pub services: BTreeSet<ServiceTag>,
}

impl Property {
    pub fn has_service(&self, service: &ServiceTag) -> bool {
        self.services.contains(service)
    }

    pub fn bedroom_count(&self) -> u32 {
        self.bedrooms.len() as u32
    }

    pub fn bed_count(&self) -> u32 {
        self.bedrooms
            .values()
            .flat_map(|bedroom| bedroom.beds.iter())
            .map(|bed| bed.number_beds)
            .sum()
    }

    pub fn bathroom_count(&self) -> u32 {
        self.bathrooms.len() as u32
    }

    pub fn amenity_count(&self) -> u32 {
        self.amenities.len() as u32
    }
}

/// Insert payload: a [`Property`] before the store has assigned its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub owner_email: String,
    pub title: String,
    pub address: String,
    pub description: String,
    pub number_guests: u32,
    pub square_meters: u32,
    pub bedrooms: BTreeMap<String, Bedroom>,
    pub bathrooms: BTreeMap<String, Bathroom>,
    pub amenities: BTreeSet<Amenity>,
    pub house_rules: HouseRules,
    pub additional_info: String,
    pub cancellation_policy: String,
    pub contacts: Vec<Contact>,
    pub price: f64,
    pub recommended_price: Option<f64>,
    pub update_price_automatically: bool,
    pub after_commission: bool,
    pub services: BTreeSet<ServiceTag>,
}

impl NewProperty {
    pub fn into_property(self, id: PropertyId) -> Property {
        Property {
            id,
            owner_email: self.owner_email,
            title: self.title,
            address: self.address,
            description: self.description,
            number_guests: self.number_guests,
            square_meters: self.square_meters,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            amenities: self.amenities,
            house_rules: self.house_rules,
            additional_info: self.additional_info,
            cancellation_policy: self.cancellation_policy,
            contacts: self.contacts,
            price: self.price,
            recommended_price: self.recommended_price,
            update_price_automatically: self.update_price_automatically,
            after_commission: self.after_commission,
            services: self.services,
        }
    }
}

/// Transient record as a wrapper service ships it: carries the wrapper-local
/// id and descriptive fields, none of the owner automation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedProperty {
    pub id: String,
    pub owner_email: String,
    pub title: String,
    pub address: String,
    pub description: String,
    pub number_guests: u32,
    pub square_meters: u32,
    pub bedrooms: BTreeMap<String, Bedroom>,
    pub bathrooms: BTreeMap<String, Bathroom>,
    pub amenities: BTreeSet<Amenity>,
    pub house_rules: HouseRules,
    pub additional_info: String,
    pub cancellation_policy: String,
    pub contacts: Vec<Contact>,
    pub price: f64,
}

impl ImportedProperty {
    /// Shape the record for insertion. Automation flags default off and the
    /// recommendation slot starts empty; owners opt in after the merge.
    pub fn into_new(self, service: ServiceTag) -> NewProperty {
        let mut services = BTreeSet::new();
        services.insert(service);

        NewProperty {
            owner_email: self.owner_email,
            title: self.title,
            address: self.address,
            description: self.description,
            number_guests: self.number_guests,
            square_meters: self.square_meters,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            amenities: self.amenities,
            house_rules: self.house_rules,
            additional_info: self.additional_info,
            cancellation_policy: self.cancellation_policy,
            contacts: self.contacts,
            price: self.price,
            recommended_price: None,
            update_price_automatically: false,
            after_commission: false,
            services,
        }
    }
}

/// Key form of an address used for duplicate detection: trimmed, internal
/// whitespace collapsed, ASCII lowercased. The stored address keeps its
/// original spelling.
pub fn normalized_address(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Key form of an owner email.
pub fn normalized_owner(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
