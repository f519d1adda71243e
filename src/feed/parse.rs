use serde::Deserialize;

use crate::feed::error::FeedError;
use crate::feed::types::QuakeEvent;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    id: Option<String>,
    #[serde(default)]
    properties: RawProperties,
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    mag: Option<f64>,
    place: Option<String>,
    time: Option<i64>,
    url: Option<String>,
    felt: Option<i64>,
    alert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: Vec<Option<f64>>,
}

/// Parse a GeoJSON feature collection into flat events.
///
/// Only a payload without a `features` array is an error. Individual
/// features that cannot yield an id, time, magnitude and coordinates are
/// dropped.
pub fn parse_feature_collection(body: &str) -> Result<Vec<QuakeEvent>, FeedError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    let total = collection.features.len();

    let events: Vec<QuakeEvent> = collection
        .features
        .into_iter()
        .filter_map(|feature| match serde_json::from_value::<RawFeature>(feature) {
            Ok(raw) => into_event(raw),
            Err(error) => {
                tracing::debug!("dropping unparseable feed feature: {error}");
                None
            }
        })
        .collect();

    if events.len() < total {
        tracing::debug!(
            "dropped {} of {} feed features missing required fields",
            total - events.len(),
            total
        );
    }
    Ok(events)
}

fn into_event(raw: RawFeature) -> Option<QuakeEvent> {
    let id = raw.id.filter(|id| !id.trim().is_empty())?;
    let coordinates = raw.geometry?.coordinates;
    let longitude = coordinates.first().copied().flatten()?;
    let latitude = coordinates.get(1).copied().flatten()?;
    let depth = coordinates.get(2).copied().flatten().unwrap_or(0.0);
    if !longitude.is_finite() || !latitude.is_finite() {
        return None;
    }

    let props = raw.properties;
    Some(QuakeEvent {
        id,
        magnitude: props.mag.filter(|mag| mag.is_finite())?,
        place: props.place.unwrap_or_default(),
        time: props.time?,
        latitude,
        longitude,
        depth,
        url: props.url.unwrap_or_default(),
        felt: props.felt,
        alert: props.alert,
        edited_by_admin: false,
        original_magnitude: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_coordinates_in_lng_lat_depth_order() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "us7000abcd",
                "properties": {
                    "mag": 5.2,
                    "place": "10 km SW of Somewhere",
                    "time": 1_700_000_000_000i64,
                    "url": "https://example.test/us7000abcd",
                    "felt": 12,
                    "alert": "green"
                },
                "geometry": { "type": "Point", "coordinates": [120.5, -8.25, 33.1] }
            }]
        })
        .to_string();

        let events = parse_feature_collection(&body).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "us7000abcd");
        assert_eq!(event.longitude, 120.5);
        assert_eq!(event.latitude, -8.25);
        assert_eq!(event.depth, 33.1);
        assert_eq!(event.felt, Some(12));
        assert_eq!(event.alert.as_deref(), Some("green"));
        assert!(!event.edited_by_admin);
    }

    #[test]
    fn drops_features_missing_geometry_or_required_properties() {
        let body = json!({
            "features": [
                { "id": "no-geometry", "properties": { "mag": 3.0, "time": 1 } },
                { "id": "short-coords", "properties": { "mag": 3.0, "time": 1 },
                  "geometry": { "coordinates": [10.0] } },
                { "id": "null-mag", "properties": { "mag": null, "time": 1 },
                  "geometry": { "coordinates": [10.0, 10.0, 5.0] } },
                { "properties": { "mag": 3.0, "time": 1 },
                  "geometry": { "coordinates": [10.0, 10.0, 5.0] } },
                { "id": "kept", "properties": { "mag": 3.0, "time": 1 },
                  "geometry": { "coordinates": [10.0, 10.0] } }
            ]
        })
        .to_string();

        let events = parse_feature_collection(&body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "kept");
        assert_eq!(events[0].depth, 0.0);
        assert_eq!(events[0].place, "");
    }

    #[test]
    fn missing_features_array_is_a_parse_failure() {
        let err = parse_feature_collection(r#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));

        let err = parse_feature_collection("<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn empty_collection_yields_no_events() {
        let events = parse_feature_collection(r#"{"features":[]}"#).unwrap();
        assert!(events.is_empty());
    }
}
