// Request and response payloads for the outbound HTTP APIs. Field names track
// the providers' JSON; everything stays behind the typed wrappers in `api`.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLngWire {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<LatLng> for LatLngWire {
    fn from(p: LatLng) -> Self {
        Self {
            latitude: p.lat,
            longitude: p.lng,
        }
    }
}

impl From<LatLngWire> for LatLng {
    fn from(p: LatLngWire) -> Self {
        Self {
            lat: p.latitude,
            lng: p.longitude,
        }
    }
}

// ---- Routes API ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRoutesRequest {
    pub origin: Waypoint,
    pub destination: Waypoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<Waypoint>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optimize_waypoint_order: bool,
    pub travel_mode: String,
    pub language_code: String,
    pub units: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    pub location: WaypointLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointLocation {
    pub lat_lng: LatLngWire,
}

impl From<LatLng> for Waypoint {
    fn from(p: LatLng) -> Self {
        Self {
            location: WaypointLocation { lat_lng: p.into() },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputeRoutesResponse {
    pub routes: Vec<RouteWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteWire {
    pub polyline: PolylineWire,
    pub localized_values: LocalizedValues,
    pub optimized_intermediate_waypoint_index: Option<Vec<usize>>,
    pub viewport: Option<ViewportWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolylineWire {
    pub encoded_polyline: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalizedValues {
    pub distance: LocalizedText,
    pub duration: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalizedText {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewportWire {
    pub high: LatLngWire,
    pub low: LatLngWire,
}

// ---- Places API (nearby + text search) ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbySearchRequest {
    pub included_types: Vec<String>,
    pub excluded_types: Vec<String>,
    pub max_result_count: u32,
    pub rank_preference: String,
    pub language_code: String,
    pub location_restriction: LocationRestriction,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationRestriction {
    pub circle: Circle,
}

#[derive(Debug, Clone, Serialize)]
pub struct Circle {
    pub center: LatLngWire,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchRequest {
    pub text_query: String,
    pub language_code: String,
    pub location_bias: LocationBias,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationBias {
    pub rectangle: RectangleWire,
}

#[derive(Debug, Clone, Serialize)]
pub struct RectangleWire {
    pub low: LatLngWire,
    pub high: LatLngWire,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlacesResponse {
    pub places: Vec<PlaceWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceWire {
    pub id: String,
    pub display_name: LocalizedText,
    pub location: LatLngWire,
    pub primary_type_display_name: LocalizedText,
    pub icon_mask_base_uri: String,
}

// ---- Area insights ----

#[derive(Debug, Clone, Serialize)]
pub struct InsightsRequest {
    pub insights: Vec<String>,
    pub filter: InsightsFilter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsFilter {
    pub location_filter: InsightsLocationFilter,
    pub type_filter: InsightsTypeFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsLocationFilter {
    pub circle: InsightsCircle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsCircle {
    pub lat_lng: LatLngWire,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsTypeFilter {
    pub included_types: Vec<String>,
}

// The count comes back as a decimal string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsightsResponse {
    pub count: Option<String>,
}

// ---- Elevation ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ElevationResponse {
    pub status: String,
    pub results: Vec<ElevationResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ElevationResult {
    pub elevation: f64,
}

// ---- Weather ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherResponse {
    pub temperature: Option<TemperatureWire>,
    pub weather_condition: Option<WeatherConditionWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemperatureWire {
    pub degrees: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherConditionWire {
    pub icon_base_uri: String,
    #[serde(rename = "type")]
    pub condition: String,
}

// ---- Generative language ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_request_serializes_to_provider_shape() {
        let req = ComputeRoutesRequest {
            origin: LatLng::new(48.0, 2.0).into(),
            destination: LatLng::new(48.1, 2.1).into(),
            intermediates: vec![],
            optimize_waypoint_order: false,
            travel_mode: "WALK".into(),
            language_code: "en".into(),
            units: "METRIC".into(),
        };

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["origin"]["location"]["latLng"]["latitude"], json!(48.0));
        assert_eq!(v["travelMode"], json!("WALK"));
        // Empty intermediates and the false flag stay off the wire.
        assert!(v.get("intermediates").is_none());
        assert!(v.get("optimizeWaypointOrder").is_none());
    }

    #[test]
    fn routes_request_with_intermediates_sets_optimization() {
        let req = ComputeRoutesRequest {
            origin: LatLng::new(0.0, 0.0).into(),
            destination: LatLng::new(0.0, 0.0).into(),
            intermediates: vec![LatLng::new(1.0, 1.0).into()],
            optimize_waypoint_order: true,
            travel_mode: "WALK".into(),
            language_code: "en".into(),
            units: "METRIC".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["optimizeWaypointOrder"], json!(true));
        assert_eq!(v["intermediates"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn routes_response_reads_optimized_index_and_viewport() {
        let raw = json!({
            "routes": [{
                "polyline": { "encodedPolyline": "abc123" },
                "localizedValues": {
                    "distance": { "text": "1.2 km" },
                    "duration": { "text": "15 mins" }
                },
                "optimizedIntermediateWaypointIndex": [2, 0, 1],
                "viewport": {
                    "high": { "latitude": 48.9, "longitude": 2.4 },
                    "low": { "latitude": 48.8, "longitude": 2.3 }
                }
            }]
        });

        let resp: ComputeRoutesResponse = serde_json::from_value(raw).unwrap();
        let route = &resp.routes[0];
        assert_eq!(route.polyline.encoded_polyline, "abc123");
        assert_eq!(
            route.optimized_intermediate_waypoint_index,
            Some(vec![2, 0, 1])
        );
        assert!(route.viewport.is_some());
    }

    #[test]
    fn place_wire_tolerates_missing_fields() {
        let raw = json!({
            "places": [
                { "id": "p1", "location": { "latitude": 1.0, "longitude": 2.0 } }
            ]
        });
        let resp: PlacesResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.places[0].id, "p1");
        assert_eq!(resp.places[0].display_name.text, "");
    }
}
