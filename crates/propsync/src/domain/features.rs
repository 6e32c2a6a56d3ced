use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Descriptive amenities advertised on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    FreeWifi,
    ParkingSpace,
    AirConditioner,
    Pool,
    Kitchen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BathroomFixture {
    Bathtub,
    Shower,
    Bidet,
    Toilet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bathroom {
    pub fixtures: Vec<BathroomFixture>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedKind {
    Single,
    Queen,
    King,
}

/// One bed line item: "2 queen beds" is a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub number_beds: u32,
    #[serde(rename = "type")]
    pub kind: BedKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bedroom {
    pub beds: Vec<Bed>,
}

/// Daily time window carried as wall-clock "HH:MM" strings on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "hour_minute")]
    pub begin_time: NaiveTime,
    #[serde(with = "hour_minute")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRules {
    pub check_in: TimeSlot,
    pub check_out: TimeSlot,
    pub smoking: bool,
    pub parties: bool,
    pub rest_time: TimeSlot,
    pub allow_pets: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone_number: String,
}

mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}
