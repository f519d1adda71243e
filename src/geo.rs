//! Bounding-region filtering and distance helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feed::QuakeEvent;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub const WORLD: Bounds = Bounds {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lng: -180.0,
        max_lng: 180.0,
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lng..=self.max_lng).contains(&longitude)
    }

    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|value| value.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Named regions selectable in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    World,
    Indonesia,
    Japan,
    California,
    Mediterranean,
}

impl Region {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Indonesia => "indonesia",
            Self::Japan => "japan",
            Self::California => "california",
            Self::Mediterranean => "mediterranean",
        }
    }

    pub const fn all() -> &'static [Region] {
        &[
            Region::World,
            Region::Indonesia,
            Region::Japan,
            Region::California,
            Region::Mediterranean,
        ]
    }

    pub const fn bounds(&self) -> Bounds {
        match self {
            Self::World => Bounds::WORLD,
            Self::Indonesia => Bounds {
                min_lat: -11.0,
                max_lat: 6.0,
                min_lng: 95.0,
                max_lng: 141.0,
            },
            Self::Japan => Bounds {
                min_lat: 24.0,
                max_lat: 46.0,
                min_lng: 122.0,
                max_lng: 146.0,
            },
            Self::California => Bounds {
                min_lat: 32.5,
                max_lat: 42.0,
                min_lng: -124.5,
                max_lng: -114.0,
            },
            Self::Mediterranean => Bounds {
                min_lat: 30.0,
                max_lat: 46.0,
                min_lng: -6.0,
                max_lng: 36.5,
            },
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::World
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Region::all()
            .iter()
            .copied()
            .find(|region| region.as_str() == normalized)
            .ok_or_else(|| format!("unknown region: {value}"))
    }
}

/// Keep events whose coordinates fall inside `bounds`, preserving order.
pub fn filter_events(events: Vec<QuakeEvent>, bounds: &Bounds) -> Vec<QuakeEvent> {
    events
        .into_iter()
        .filter(|event| bounds.contains(event.latitude, event.longitude))
        .collect()
}

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyEvent {
    pub event: QuakeEvent,
    pub distance_km: f64,
}

/// The `limit` events closest to a point, nearest first.
pub fn nearest(events: &[QuakeEvent], latitude: f64, longitude: f64, limit: usize) -> Vec<NearbyEvent> {
    let mut nearby: Vec<NearbyEvent> = events
        .iter()
        .map(|event| NearbyEvent {
            distance_km: distance_km(latitude, longitude, event.latitude, event.longitude),
            event: event.clone(),
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby.truncate(limit);
    nearby
}
