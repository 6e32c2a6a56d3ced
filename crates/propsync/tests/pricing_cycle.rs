mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use propsync::domain::PropertyId;
use propsync::messaging::{
    InMemoryBroker, MessageKind, PriceRequestBody, PriceResponseBody, PropertyUpdateBody,
};
use propsync::store::{InMemoryPropertyStore, PropertyFilter, PropertyStore};
use propsync::sync::{PriceOrchestrator, UpdateBroadcastPublisher};

use common::{decode, owned, spy};

type Orchestrator = PriceOrchestrator<InMemoryPropertyStore, InMemoryBroker>;

async fn orchestrator() -> (Arc<InMemoryBroker>, Arc<InMemoryPropertyStore>, Orchestrator) {
    let (broker, gateway) = common::gateway().await;
    let store = Arc::new(InMemoryPropertyStore::default());
    let broadcast = Arc::new(UpdateBroadcastPublisher::new(gateway.clone()));
    let pricing = PriceOrchestrator::new(store.clone(), gateway, broadcast);
    (broker, store, pricing)
}

#[tokio::test]
async fn empty_store_sends_no_request() {
    let (broker, _store, pricing) = orchestrator().await;
    let mut requests = spy(&broker, "spy.analytics", "analytics.pricing.request").await;

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds");

    assert!(request_id.is_none());
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn request_snapshots_every_property_without_owner_identity() {
    let (broker, store, pricing) = orchestrator().await;
    let mut requests = spy(&broker, "spy.analytics", "analytics.pricing.request").await;

    store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, false))
        .await
        .expect("insert");
    store
        .insert_one(owned("host@example.com", "3 Hillside Lane", 80.0, true))
        .await
        .expect("insert");

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let envelope = decode(&requests.try_recv().expect("one batched request"));
    assert_eq!(envelope.kind, MessageKind::GetRecommendedPrice);

    let body: PriceRequestBody = envelope.body_as().expect("body decodes");
    assert_eq!(body.request_id, request_id);
    assert_eq!(body.snapshots.len(), 2);

    let raw = envelope.body["snapshots"][0]
        .as_object()
        .expect("snapshot is an object");
    assert!(raw.contains_key("location"));
    assert!(raw.contains_key("price"));
    assert!(!raw.contains_key("owner_email"), "snapshots are anonymized");
}

#[tokio::test]
async fn automation_applies_the_price_and_broadcasts_once() {
    let (broker, store, pricing) = orchestrator().await;
    let mut broadcasts = spy(&broker, "spy.broadcast", "wrappers.broadcast.updates").await;

    let property = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, true))
        .await
        .expect("insert");

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let summary = pricing
        .apply_recommendations(PriceResponseBody {
            request_id,
            prices: BTreeMap::from([(property.id.clone(), 120.0)]),
        })
        .await
        .expect("response applies");

    assert_eq!(summary.applied, 1);
    assert_eq!(summary.noted, 0);
    assert!(!summary.stale);

    let updated = store
        .find_one(PropertyFilter::by_id(property.id.clone()))
        .await
        .expect("find")
        .expect("record exists");
    assert!((updated.price - 120.0).abs() < f64::EPSILON);
    assert_eq!(updated.recommended_price, Some(120.0));

    let update = decode(&broadcasts.try_recv().expect("one broadcast"));
    assert_eq!(update.kind, MessageKind::PropertyUpdate);
    let body: PropertyUpdateBody = update.body_as().expect("body decodes");
    assert_eq!(body.property_id, property.id);
    assert!(body.changed_fields.contains("price"));
    assert!(
        body.changed_fields.contains("after_commission"),
        "price changes always carry the commission flag"
    );
    assert!(broadcasts.try_recv().is_err(), "exactly one broadcast");
}

#[tokio::test]
async fn manual_owner_only_gets_the_recommendation_recorded() {
    let (broker, store, pricing) = orchestrator().await;
    let mut broadcasts = spy(&broker, "spy.broadcast", "wrappers.broadcast.updates").await;

    let property = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, false))
        .await
        .expect("insert");

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let summary = pricing
        .apply_recommendations(PriceResponseBody {
            request_id,
            prices: BTreeMap::from([(property.id.clone(), 120.0)]),
        })
        .await
        .expect("response applies");

    assert_eq!(summary.applied, 0);
    assert_eq!(summary.noted, 1);

    let updated = store
        .find_one(PropertyFilter::by_id(property.id))
        .await
        .expect("find")
        .expect("record exists");
    assert!((updated.price - 100.0).abs() < f64::EPSILON, "price untouched");
    assert_eq!(updated.recommended_price, Some(120.0));
    assert!(broadcasts.try_recv().is_err(), "no broadcast without automation");
}

#[tokio::test]
async fn matching_recommendation_is_noted_without_a_broadcast() {
    let (broker, store, pricing) = orchestrator().await;
    let mut broadcasts = spy(&broker, "spy.broadcast", "wrappers.broadcast.updates").await;

    let property = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, true))
        .await
        .expect("insert");

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let summary = pricing
        .apply_recommendations(PriceResponseBody {
            request_id,
            prices: BTreeMap::from([(property.id.clone(), 100.0)]),
        })
        .await
        .expect("response applies");

    assert_eq!(summary.applied, 0);
    assert_eq!(summary.noted, 1);

    let updated = store
        .find_one(PropertyFilter::by_id(property.id))
        .await
        .expect("find")
        .expect("record exists");
    assert_eq!(updated.recommended_price, Some(100.0));
    assert!(broadcasts.try_recv().is_err());
}

#[tokio::test]
async fn stale_response_is_dropped_wholesale() {
    let (_broker, store, pricing) = orchestrator().await;

    let property = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, true))
        .await
        .expect("insert");

    pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let summary = pricing
        .apply_recommendations(PriceResponseBody {
            request_id: Uuid::new_v4(),
            prices: BTreeMap::from([(property.id.clone(), 500.0)]),
        })
        .await
        .expect("stale response handled");

    assert!(summary.stale);
    assert_eq!(summary.applied + summary.noted + summary.skipped, 0);

    let untouched = store
        .find_one(PropertyFilter::by_id(property.id))
        .await
        .expect("find")
        .expect("record exists");
    assert!((untouched.price - 100.0).abs() < f64::EPSILON);
    assert_eq!(untouched.recommended_price, None);
}

#[tokio::test]
async fn unknown_property_ids_are_skipped() {
    let (_broker, store, pricing) = orchestrator().await;

    let property = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, true))
        .await
        .expect("insert");

    let request_id = pricing
        .request_recommendations()
        .await
        .expect("request succeeds")
        .expect("request sent");

    let summary = pricing
        .apply_recommendations(PriceResponseBody {
            request_id,
            prices: BTreeMap::from([
                (property.id.clone(), 120.0),
                (PropertyId("prop-999999".to_string()), 75.0),
            ]),
        })
        .await
        .expect("response applies");

    assert_eq!(summary.applied, 1);
    assert_eq!(summary.skipped, 1, "deleted-property races stay benign");
}
