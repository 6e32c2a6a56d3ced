use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Property, PropertyId, ServiceTag};

/// Feature vector shipped with a price recommendation request. Carries no
/// owner identity; the analytics service prices listings, not hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub property_id: PropertyId,
    pub location: String,
    pub number_guests: u32,
    pub square_meters: u32,
    pub bedroom_count: u32,
    pub bed_count: u32,
    pub bathroom_count: u32,
    pub amenity_count: u32,
    pub price: f64,
}

impl PricingSnapshot {
    pub fn from_property(property: &Property) -> Self {
        Self {
            property_id: property.id.clone(),
            location: property.address.clone(),
            number_guests: property.number_guests,
            square_meters: property.square_meters,
            bedroom_count: property.bedroom_count(),
            bed_count: property.bed_count(),
            bathroom_count: property.bathroom_count(),
            amenity_count: property.amenity_count(),
            price: property.price,
        }
    }
}

/// Periodic export row for the analytics sink: the pricing features plus the
/// operational fields useful for aggregation. Still anonymized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub property_id: PropertyId,
    pub location: String,
    pub number_guests: u32,
    pub square_meters: u32,
    pub bedroom_count: u32,
    pub bed_count: u32,
    pub bathroom_count: u32,
    pub amenity_count: u32,
    pub price: f64,
    pub recommended_price: Option<f64>,
    pub services: BTreeSet<ServiceTag>,
}

impl AnalyticsSnapshot {
    pub fn from_property(property: &Property) -> Self {
        Self {
            property_id: property.id.clone(),
            location: property.address.clone(),
            number_guests: property.number_guests,
            square_meters: property.square_meters,
            bedroom_count: property.bedroom_count(),
            bed_count: property.bed_count(),
            bathroom_count: property.bathroom_count(),
            amenity_count: property.amenity_count(),
            price: property.price,
            recommended_price: property.recommended_price,
            services: property.services.clone(),
        }
    }
}
