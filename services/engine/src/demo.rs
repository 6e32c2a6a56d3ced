use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveTime;
use clap::Args;
use propsync::domain::{
    Amenity, Bathroom, BathroomFixture, Bed, BedKind, Bedroom, Contact, HouseRules,
    ImportedProperty, PropertyId, ServiceTag, TimeSlot,
};
use propsync::error::AppError;
use propsync::messaging::{
    keys, BrokerGateway, Envelope, InMemoryBroker, MessageTransport, PriceRequestBody,
    PriceResponseBody,
};
use propsync::store::{InMemoryPropertyStore, PropertyFilter, PropertyPatch, PropertyStore};
use propsync::sync::{
    AnalyticsSnapshotPublisher, PriceOrchestrator, ReconciliationEngine, UpdateBroadcastPublisher,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Owner email used for every demo batch
    #[arg(long, default_value = "demo-host@example.com")]
    pub(crate) owner: String,
    /// Print the canonical records left in the store at the end
    #[arg(long)]
    pub(crate) list_properties: bool,
}

/// End-to-end in-process run: two wrapper imports with an overlapping
/// listing, one pricing cycle with a fabricated analytics response, and one
/// analytics export.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        owner,
        list_properties,
    } = args;

    println!("PropSync engine demo");

    let transport = Arc::new(InMemoryBroker::default());
    let gateway = Arc::new(BrokerGateway::connect(transport.clone(), "propsync").await?);
    let store = Arc::new(InMemoryPropertyStore::default());

    let reconciliation = ReconciliationEngine::new(store.clone(), gateway.clone());
    let broadcast = Arc::new(UpdateBroadcastPublisher::new(gateway.clone()));
    let pricing = PriceOrchestrator::new(store.clone(), gateway.clone(), broadcast);
    let analytics = AnalyticsSnapshotPublisher::new(store.clone(), gateway.clone());

    // Stand in for the analytics service: capture the outbound pricing
    // request so a response can be fabricated below.
    transport.declare_queue("demo.analytics").await?;
    transport
        .bind_queue("demo.analytics", gateway.exchange(), keys::PRICING_REQUEST)
        .await?;
    let mut pricing_requests = transport.consume("demo.analytics").await?;

    let zooking = ServiceTag::new("zooking");
    let earthstayz = ServiceTag::new("earthstayz");

    let first = reconciliation
        .import_batch(
            zooking.clone(),
            vec![
                demo_record("zk-101", &owner, "12 Harbor Road", 120.0),
                demo_record("zk-102", &owner, "3 Hillside Lane", 95.0),
            ],
        )
        .await
        .map_err(AppError::server)?;
    println!(
        "\nImport from {zooking}: {} created, {} merged, {} ids remapped",
        first.created,
        first.merged,
        first.id_map.len()
    );

    // The first record duplicates the harbor listing modulo spacing.
    let second = reconciliation
        .import_batch(
            earthstayz.clone(),
            vec![
                demo_record("es-7", &owner, " 12  Harbor   Road ", 118.0),
                demo_record("es-8", &owner, "44 Quayside Walk", 150.0),
            ],
        )
        .await
        .map_err(AppError::server)?;
    println!(
        "Import from {earthstayz}: {} created, {} merged, {} ids remapped",
        second.created,
        second.merged,
        second.id_map.len()
    );
    for (old, new) in &second.id_map {
        println!("  {old} -> {new}");
    }

    // The harbor owner opts in to automatic pricing.
    store
        .update_one(
            PropertyFilter::by_owner_address(owner.as_str(), "12 Harbor Road"),
            PropertyPatch::new().update_price_automatically(true),
        )
        .await?;

    let Some(request_id) = pricing.request_recommendations().await.map_err(AppError::server)? else {
        println!("\nNo properties to price, demo ends early");
        return Ok(());
    };

    let delivery = pricing_requests
        .recv()
        .await
        .ok_or_else(|| AppError::server("pricing request channel closed"))?;
    let request: PriceRequestBody = Envelope::from_bytes(&delivery.payload)
        .map_err(AppError::server)?
        .body_as()
        .map_err(AppError::server)?;
    println!(
        "\nAnalytics request {request_id} covers {} properties",
        request.snapshots.len()
    );

    // Fabricate the analytics answer: recommend ten percent over asking.
    let prices: BTreeMap<PropertyId, f64> = request
        .snapshots
        .iter()
        .map(|snapshot| {
            (
                snapshot.property_id.clone(),
                (snapshot.price * 1.1 * 100.0).round() / 100.0,
            )
        })
        .collect();
    let summary = pricing
        .apply_recommendations(PriceResponseBody { request_id, prices })
        .await
        .map_err(AppError::server)?;
    println!(
        "Recommendations: {} auto-applied, {} recorded for review, {} skipped",
        summary.applied, summary.noted, summary.skipped
    );

    let rows = analytics.publish_snapshot().await.map_err(AppError::server)?;
    println!("Analytics snapshot exported {rows} rows");

    if list_properties {
        println!("\nCanonical records:");
        for property in store.find_many(PropertyFilter::all()).await? {
            let services = property
                .services
                .iter()
                .map(|service| service.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let recommended = property
                .recommended_price
                .map(|price| format!("{price:.2}"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {} | {} | price {:.2} | recommended {} | services: {}",
                property.id, property.address, property.price, recommended, services
            );
        }
    }

    Ok(())
}

fn demo_record(id: &str, owner: &str, address: &str, price: f64) -> ImportedProperty {
    let slot = |begin: u32, end: u32| TimeSlot {
        begin_time: NaiveTime::from_hms_opt(begin, 0, 0).unwrap_or(NaiveTime::MIN),
        end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap_or(NaiveTime::MIN),
    };

    ImportedProperty {
        id: id.to_string(),
        owner_email: owner.to_string(),
        title: format!("Listing at {}", address.trim()),
        address: address.to_string(),
        description: "Demo listing".to_string(),
        number_guests: 4,
        square_meters: 80,
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
        house_rules: HouseRules {
            check_in: slot(14, 20),
            check_out: slot(8, 10),
            smoking: false,
            parties: false,
            rest_time: slot(22, 7),
            allow_pets: true,
        },
        additional_info: String::new(),
        cancellation_policy: "flexible".to_string(),
        contacts: vec![Contact {
            name: "Demo Host".to_string(),
            phone_number: "+15550100".to_string(),
        }],
        price,
    }
}
