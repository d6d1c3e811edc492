// Outbound API client: one retrying, caching `request` path plus a typed
// wrapper per endpoint (routes, place search, elevation, weather, transit
// insights, tour generation).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::cache::ApiCache;
use crate::config::{ApiConfig, AppConfig, Category};
use crate::error::Error;
use crate::geo::{LatLng, LatLngBounds};
use crate::wire::{
    Circle, ComputeRoutesRequest, ComputeRoutesResponse, Content, ElevationResponse,
    GenerateContentRequest, GenerateContentResponse, InsightsCircle, InsightsFilter,
    InsightsLocationFilter, InsightsRequest, InsightsTypeFilter, LocationBias,
    LocationRestriction, NearbySearchRequest, Part, PlacesResponse, RectangleWire,
    TextSearchRequest, WeatherResponse,
};

const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

const ROUTE_FIELDS: &str = "routes.polyline,routes.localizedValues";
const ROUTE_FIELDS_OPTIMIZED: &str =
    "routes.polyline,routes.localizedValues,routes.optimized_intermediate_waypoint_index,routes.viewport";
const NEARBY_FIELDS: &str =
    "places.id,places.displayName,places.location,places.iconMaskBaseUri,places.primaryTypeDisplayName";
const HOTEL_FIELDS: &str = "places.id,places.displayName,places.location";

const EXCLUDED_NEARBY_TYPES: [&str; 6] = [
    "hotel",
    "grocery_store",
    "supermarket",
    "bus_station",
    "train_station",
    "transit_station",
];

const TRANSIT_STATION_TYPES: [&str; 5] = [
    "subway_station",
    "bus_station",
    "train_station",
    "transit_station",
    "light_rail_station",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(&'static str, String)>,
}

impl ApiRequest {
    fn get(url: String) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
            headers: Vec::new(),
        }
    }

    fn post(url: String, body: Value, headers: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body),
            headers,
        }
    }
}

// Seam between the client and the wire; tests script it, production speaks
// HTTP through reqwest.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<Value, Error>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<Value, Error> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| Error::Network {
            attempts: 1,
            last: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

// ---- Domain results ----

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSummary {
    pub id: String,
    pub display_name: String,
    pub location: LatLng,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyFeature {
    pub id: String,
    pub display_name: String,
    pub location: LatLng,
    pub primary_type: String,
    pub icon_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub encoded_polyline: String,
    pub distance_text: String,
    pub duration_text: String,
    pub optimized_order: Option<Vec<usize>>,
    pub viewport: Option<LatLngBounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub degrees_c: f64,
    pub icon_uri: String,
    pub condition: String,
}

// Place list given to the tour generator; serialized into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourPlace {
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: String,
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub location: LatLng,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiTour {
    pub route_title: String,
    pub route_description: String,
    #[serde(default)]
    pub stops: Vec<TourStop>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TourStop {
    pub name: String,
    #[serde(rename = "type", default)]
    pub stop_type: String,
    #[serde(rename = "placeId", default)]
    pub place_id: String,
    pub location: LatLng,
    #[serde(default)]
    pub description: String,
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: ApiCache,
    api: ApiConfig,
    app: AppConfig,
}

impl ApiClient {
    pub fn new(api: ApiConfig, app: AppConfig) -> Self {
        Self::with_transport(api, app, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(api: ApiConfig, app: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = ApiCache::new(app.cache_capacity, app.cache_ttl);
        Self {
            transport,
            cache,
            api,
            app,
        }
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    // Cache lookup, then up to `max_retries` attempts with exponential
    // backoff. Non-2xx counts as a retryable failure; the final failure is
    // surfaced as `Network` carrying the last error.
    async fn request(&self, request: ApiRequest, use_cache: bool) -> Result<Value, Error> {
        let body = request.body.as_ref().map(|b| b.to_string());
        let cache_key = ApiCache::generate_key(&request.url, body.as_deref());

        if use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                debug!(url = %request.url, "cache hit");
                return Ok(cached);
            }
        }

        let max_retries = self.app.retry.max_retries.max(1);
        for attempt in 0..max_retries {
            match self.transport.execute(&request).await {
                Ok(data) => {
                    if use_cache {
                        self.cache.insert(cache_key, data.clone());
                    }
                    return Ok(data);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    error!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_retries,
                        %err,
                        "API call failed"
                    );
                    if attempt + 1 == max_retries {
                        return Err(Error::Network {
                            attempts: max_retries,
                            last: err.to_string(),
                        });
                    }
                    tokio::time::sleep(self.app.retry.backoff(attempt)).await;
                }
            }
        }
        unreachable!("retry loop always returns")
    }

    fn key_header(&self) -> (&'static str, String) {
        (API_KEY_HEADER, self.api.api_key.clone())
    }

    fn parse<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, Error> {
        serde_json::from_value(data).map_err(|e| Error::Parse(e.to_string()))
    }

    // Free-text hotel search biased to a square around the destination.
    pub async fn search_hotels(
        &self,
        address: &str,
        center: LatLng,
        labels: (&str, &str),
    ) -> Result<Vec<PlaceSummary>, Error> {
        center.validate()?;

        let bounds = LatLngBounds::from_center_and_radius(center, self.app.hotel_bias_radius_m);
        let body = TextSearchRequest {
            text_query: format!("hotel near {} and {} in {}", labels.0, labels.1, address),
            language_code: "en".into(),
            location_bias: LocationBias {
                rectangle: RectangleWire {
                    low: bounds.sw.into(),
                    high: bounds.ne.into(),
                },
            },
        };

        let request = ApiRequest::post(
            self.api.text_search_url.clone(),
            serde_json::to_value(&body).map_err(|e| Error::Parse(e.to_string()))?,
            vec![(FIELD_MASK_HEADER, HOTEL_FIELDS.into()), self.key_header()],
        );

        let data = self.request(request, true).await?;
        let response: PlacesResponse = Self::parse(data)?;
        Ok(response
            .places
            .into_iter()
            .map(|p| PlaceSummary {
                id: p.id,
                display_name: p.display_name.text,
                location: p.location.into(),
            })
            .collect())
    }

    // Circle-restricted nearby search, popularity-ranked, capped result count.
    pub async fn search_nearby(
        &self,
        center: LatLng,
        included_types: &[String],
    ) -> Result<Vec<NearbyFeature>, Error> {
        center.validate()?;

        let body = NearbySearchRequest {
            included_types: included_types.to_vec(),
            excluded_types: EXCLUDED_NEARBY_TYPES.iter().map(|t| t.to_string()).collect(),
            max_result_count: self.app.max_results,
            rank_preference: "POPULARITY".into(),
            language_code: "en".into(),
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: center.into(),
                    radius: self.app.search_radius_m,
                },
            },
        };

        let request = ApiRequest::post(
            self.api.nearby_search_url.clone(),
            serde_json::to_value(&body).map_err(|e| Error::Parse(e.to_string()))?,
            vec![(FIELD_MASK_HEADER, NEARBY_FIELDS.into()), self.key_header()],
        );

        let data = self.request(request, true).await?;
        let response: PlacesResponse = Self::parse(data)?;
        Ok(response
            .places
            .into_iter()
            .map(|p| NearbyFeature {
                id: p.id,
                display_name: p.display_name.text,
                location: p.location.into(),
                primary_type: p.primary_type_display_name.text,
                icon_uri: p.icon_mask_base_uri,
            })
            .collect())
    }

    // Walking route. With intermediates the provider optimizes the visiting
    // order and returns the index array plus a viewport for framing.
    pub async fn compute_route(
        &self,
        origin: LatLng,
        destination: LatLng,
        intermediates: &[LatLng],
    ) -> Result<RouteResult, Error> {
        origin.validate()?;
        destination.validate()?;
        for stop in intermediates {
            stop.validate()?;
        }

        let optimize = !intermediates.is_empty();
        let body = ComputeRoutesRequest {
            origin: origin.into(),
            destination: destination.into(),
            intermediates: intermediates.iter().map(|&p| p.into()).collect(),
            optimize_waypoint_order: optimize,
            travel_mode: "WALK".into(),
            language_code: "en".into(),
            units: "METRIC".into(),
        };

        let fields = if optimize {
            ROUTE_FIELDS_OPTIMIZED
        } else {
            ROUTE_FIELDS
        };
        let request = ApiRequest::post(
            self.api.routes_url.clone(),
            serde_json::to_value(&body).map_err(|e| Error::Parse(e.to_string()))?,
            vec![(FIELD_MASK_HEADER, fields.into()), self.key_header()],
        );

        let data = self.request(request, true).await?;
        let response: ComputeRoutesResponse = Self::parse(data)?;
        let route = response.routes.into_iter().next().ok_or(Error::RouteGeneration)?;

        Ok(RouteResult {
            encoded_polyline: route.polyline.encoded_polyline,
            distance_text: route.localized_values.distance.text,
            duration_text: route.localized_values.duration.text,
            optimized_order: route.optimized_intermediate_waypoint_index,
            viewport: route.viewport.map(|v| LatLngBounds {
                sw: v.low.into(),
                ne: v.high.into(),
            }),
        })
    }

    // Ground elevation in meters. Soft: any provider failure degrades to 0.
    pub async fn elevation(&self, point: LatLng) -> Result<f64, Error> {
        point.validate()?;

        let url = format!(
            "{}?locations={}%2C{}&key={}",
            self.api.elevation_url, point.lat, point.lng, self.api.api_key
        );

        match self.request(ApiRequest::get(url), true).await {
            Ok(data) => {
                let response: ElevationResponse = Self::parse(data).unwrap_or_default();
                if response.status == "OK" {
                    if let Some(first) = response.results.first() {
                        return Ok(first.elevation);
                    }
                }
                error!(status = %response.status, "elevation lookup returned no result");
                Ok(0.0)
            }
            Err(err) => {
                error!(%err, "elevation fetch failed");
                Ok(0.0)
            }
        }
    }

    // Current conditions. Soft: failures degrade to `None` and the caller
    // hides the weather panel.
    pub async fn weather(&self, point: LatLng) -> Result<Option<CurrentWeather>, Error> {
        point.validate()?;

        let url = format!(
            "{}?key={}&location.latitude={}&location.longitude={}",
            self.api.weather_url, self.api.api_key, point.lat, point.lng
        );

        match self.request(ApiRequest::get(url), true).await {
            Ok(data) => {
                let response: WeatherResponse = Self::parse(data).unwrap_or_default();
                Ok(match (response.temperature, response.weather_condition) {
                    (Some(temperature), Some(condition)) => Some(CurrentWeather {
                        degrees_c: temperature.degrees,
                        icon_uri: condition.icon_base_uri,
                        condition: condition.condition,
                    }),
                    _ => None,
                })
            }
            Err(err) => {
                error!(%err, "weather fetch failed");
                Ok(None)
            }
        }
    }

    // Number of transit stations within a small radius of the point.
    pub async fn transit_count(&self, point: LatLng) -> Result<u64, Error> {
        point.validate()?;

        let body = InsightsRequest {
            insights: vec!["INSIGHT_COUNT".into()],
            filter: InsightsFilter {
                location_filter: InsightsLocationFilter {
                    circle: InsightsCircle {
                        lat_lng: point.into(),
                        radius: self.app.transit_radius_m,
                    },
                },
                type_filter: InsightsTypeFilter {
                    included_types: TRANSIT_STATION_TYPES.iter().map(|t| t.to_string()).collect(),
                },
            },
        };

        let request = ApiRequest::post(
            self.api.insights_url.clone(),
            serde_json::to_value(&body).map_err(|e| Error::Parse(e.to_string()))?,
            vec![self.key_header()],
        );

        let data = self.request(request, true).await?;
        let response: crate::wire::InsightsResponse = Self::parse(data)?;
        Ok(response
            .count
            .and_then(|c| c.parse().ok())
            .unwrap_or(0))
    }

    // Asks the model for a curated stop list over the places found near the
    // hotel. The reply arrives as fenced JSON; strip the fence, then parse.
    pub async fn generate_tour(
        &self,
        places: &[TourPlace],
        categories: (&Category, &Category),
    ) -> Result<AiTour, Error> {
        let place_list =
            serde_json::to_string(places).map_err(|e| Error::Parse(e.to_string()))?;
        let prompt = format!(
            "Based on the following list of places and their types, could you generate a JSON \
             object for each stop and describe the stop? You don't need to use all stops, just \
             the ones that are the most interesting based on the {} and {} as interests. also \
             return in JSON a short summary title and description of the whole route. The list \
             of location is the following: {}. The resulting JSON object should look like: \
             {{route_description: string, route_title:string, stops[{{name:string,type:string,\
             placeId: string, location: {{lat:number,lng:number}}, description:string}}]}}",
            categories.0.short, categories.1.short, place_list
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let request = ApiRequest::post(
            self.api.generative_url.clone(),
            serde_json::to_value(&body).map_err(|e| Error::Parse(e.to_string()))?,
            vec![self.key_header()],
        );

        let data = self.request(request, true).await?;
        let response: GenerateContentResponse = Self::parse(data)?;
        let text = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| Error::Parse("response contained no candidates".into()))?;

        let cleaned = strip_code_fences(text);
        serde_json::from_str(cleaned).map_err(|e| Error::Parse(e.to_string()))
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}
