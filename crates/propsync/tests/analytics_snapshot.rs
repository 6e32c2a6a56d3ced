mod common;

use std::sync::Arc;

use propsync::messaging::{AnalyticsBody, MessageKind};
use propsync::store::{InMemoryPropertyStore, PropertyFilter, PropertyPatch, PropertyStore};
use propsync::sync::AnalyticsSnapshotPublisher;

use common::{decode, owned, spy};

#[tokio::test]
async fn empty_store_publishes_nothing() {
    let (broker, gateway) = common::gateway().await;
    let mut sink = spy(&broker, "spy.sink", "analytics.data.snapshots").await;
    let store = Arc::new(InMemoryPropertyStore::default());
    let publisher = AnalyticsSnapshotPublisher::new(store, gateway);

    let rows = publisher.publish_snapshot().await.expect("snapshot runs");

    assert_eq!(rows, 0);
    assert!(sink.try_recv().is_err());
}

#[tokio::test]
async fn snapshot_batches_every_property_with_operational_fields() {
    let (broker, gateway) = common::gateway().await;
    let mut sink = spy(&broker, "spy.sink", "analytics.data.snapshots").await;
    let store = Arc::new(InMemoryPropertyStore::default());
    let publisher = AnalyticsSnapshotPublisher::new(store.clone(), gateway);

    let first = store
        .insert_one(owned("host@example.com", "12 Harbor Road", 100.0, false))
        .await
        .expect("insert");
    store
        .insert_one(owned("host@example.com", "3 Hillside Lane", 80.0, false))
        .await
        .expect("insert");
    store
        .update_one(
            PropertyFilter::by_id(first.id.clone()),
            PropertyPatch::new().recommended_price(110.0),
        )
        .await
        .expect("update");

    let rows = publisher.publish_snapshot().await.expect("snapshot runs");
    assert_eq!(rows, 2);

    let envelope = decode(&sink.try_recv().expect("one batched export"));
    assert_eq!(envelope.kind, MessageKind::SendDataToAnalytics);
    assert!(sink.try_recv().is_err(), "one message per tick");

    let body: AnalyticsBody = envelope.body_as().expect("body decodes");
    assert_eq!(body.snapshots.len(), 2);
    let harbor = body
        .snapshots
        .iter()
        .find(|snapshot| snapshot.property_id == first.id)
        .expect("harbor row present");
    assert_eq!(harbor.recommended_price, Some(110.0));
    assert!(!harbor.services.is_empty());

    let raw = envelope.body["snapshots"][0]
        .as_object()
        .expect("snapshot is an object");
    assert!(raw.contains_key("services"));
    assert!(raw.contains_key("recommended_price"));
    assert!(!raw.contains_key("owner_email"), "exports stay anonymized");
}
