use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveTime;
use tokio::sync::mpsc;

use propsync::domain::{
    Amenity, Bathroom, BathroomFixture, Bed, BedKind, Bedroom, Contact, HouseRules,
    ImportedProperty, NewProperty, ServiceTag, TimeSlot,
};
use propsync::messaging::{BrokerGateway, Delivery, Envelope, InMemoryBroker, MessageTransport};

pub fn sample_rules() -> HouseRules {
    let slot = |hour: u32| TimeSlot {
        begin_time: NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"),
        end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).expect("valid time"),
    };
    HouseRules {
        check_in: slot(14),
        check_out: slot(10),
        smoking: false,
        parties: false,
        rest_time: slot(22),
        allow_pets: true,
    }
}

/// A wrapper record with realistic descriptive fields.
pub fn imported(id: &str, owner: &str, address: &str, price: f64) -> ImportedProperty {
    ImportedProperty {
        id: id.to_string(),
        owner_email: owner.to_string(),
        title: format!("Listing at {address}"),
        address: address.to_string(),
        description: "Bright two-bedroom flat".to_string(),
        number_guests: 4,
        square_meters: 85,
        bedrooms: BTreeMap::from([(
            "master".to_string(),
            Bedroom {
                beds: vec![Bed {
                    number_beds: 1,
                    kind: BedKind::Queen,
                }],
            },
        )]),
        bathrooms: BTreeMap::from([(
            "main".to_string(),
            Bathroom {
                fixtures: vec![BathroomFixture::Shower, BathroomFixture::Toilet],
            },
        )]),
        amenities: BTreeSet::from([Amenity::FreeWifi, Amenity::Kitchen]),
        house_rules: sample_rules(),
        additional_info: String::new(),
        cancellation_policy: "flexible".to_string(),
        contacts: vec![Contact {
            name: "Ana".to_string(),
            phone_number: "+351912345678".to_string(),
        }],
        price,
    }
}

/// An owner-created record, as the CRUD surface would insert it.
pub fn owned(owner: &str, address: &str, price: f64, auto: bool) -> NewProperty {
    let mut new = imported("owner-made", owner, address, price).into_new(ServiceTag::new("direct"));
    new.update_price_automatically = auto;
    new
}

/// Broker plus a gateway with the full engine topology declared.
pub async fn gateway() -> (Arc<InMemoryBroker>, Arc<BrokerGateway<InMemoryBroker>>) {
    let broker = Arc::new(InMemoryBroker::default());
    let gateway = BrokerGateway::connect(broker.clone(), "propsync")
        .await
        .expect("topology declares");
    (broker, Arc::new(gateway))
}

/// Extra queue bound to `pattern` so a test can watch outbound traffic.
pub async fn spy(
    broker: &InMemoryBroker,
    queue: &str,
    pattern: &str,
) -> mpsc::UnboundedReceiver<Delivery> {
    broker.declare_queue(queue).await.expect("queue declares");
    broker
        .bind_queue(queue, "propsync", pattern)
        .await
        .expect("binding declares");
    broker.consume(queue).await.expect("consumer opens")
}

pub fn decode(delivery: &Delivery) -> Envelope {
    Envelope::from_bytes(&delivery.payload).expect("envelope decodes")
}
