//! Installation locations managed under `trafficLight/locations`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    #[default]
    Operational,
    Maintenance,
    Offline,
}

impl std::fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operational => write!(f, "operational"),
            Self::Maintenance => write!(f, "maintenance"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Location body as stored; the id is the store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub installation_date: NaiveDate,
    pub status: LocationStatus,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A location together with its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(flatten)]
    pub record: LocationRecord,
}

/// Operator input for a new location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub coordinates: Coordinates,
    /// Defaults to today when omitted.
    #[serde(default)]
    pub installation_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: LocationStatus,
    #[serde(default)]
    pub description: String,
}

impl NewLocation {
    pub fn into_record(self, created_at: DateTime<Utc>) -> LocationRecord {
        LocationRecord {
            name: self.name,
            address: self.address,
            coordinates: self.coordinates,
            installation_date: self
                .installation_date
                .unwrap_or_else(|| created_at.date_naive()),
            status: self.status,
            description: self.description,
            created_at,
        }
    }
}

/// The three locations written on first load of an empty store.
pub fn seed_locations(created_at: DateTime<Utc>) -> Vec<Location> {
    let seed = |id: &str,
                name: &str,
                address: &str,
                latitude: f64,
                longitude: f64,
                (y, m, d): (i32, u32, u32),
                status: LocationStatus,
                description: &str| Location {
        id: id.to_string(),
        record: LocationRecord {
            name: name.to_string(),
            address: address.to_string(),
            coordinates: Coordinates {
                latitude,
                longitude,
            },
            installation_date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            status,
            description: description.to_string(),
            created_at,
        },
    };

    vec![
        seed(
            "loc1",
            "Downtown Intersection",
            "123 Main St, Lusaka",
            -15.4167,
            28.2833,
            (2024, 2, 1),
            LocationStatus::Operational,
            "Main intersection near city center",
        ),
        seed(
            "loc2",
            "Westside Junction",
            "456 West Ave, Lusaka",
            -15.4267,
            28.2733,
            (2024, 2, 5),
            LocationStatus::Maintenance,
            "Busy junction near shopping district",
        ),
        seed(
            "loc3",
            "Eastside Crossing",
            "789 East Rd, Lusaka",
            -15.4067,
            28.2933,
            (2024, 2, 10),
            LocationStatus::Operational,
            "Major crossing near residential area",
        ),
    ]
}
