// Configuration: tuning constants, retry policy and the category catalog.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    // Exponential backoff with jitter to avoid thundering herd.
    pub fn backoff(&self, retry_attempt: u32) -> Duration {
        let base_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff_ms as f64);

        let jitter = rand::random::<f64>() * self.jitter_factor * base_ms;
        let backoff_ms = base_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraRanges {
    pub overview: f64,
    pub detail: f64,
    pub close_up: f64,
    pub super_overview: f64,
}

impl Default for CameraRanges {
    fn default() -> Self {
        Self {
            overview: 10_000.0,
            detail: 4_000.0,
            close_up: 250.0,
            super_overview: 50_000_000.0,
        }
    }
}

// Endpoint configuration for the outbound API calls. The key is an embedded
// client credential, exactly as the app it serves ships it; treat it as
// public and rotate/restrict it accordingly.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub routes_url: String,
    pub nearby_search_url: String,
    pub text_search_url: String,
    pub elevation_url: String,
    pub weather_url: String,
    pub insights_url: String,
    pub generative_url: String,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            routes_url: "https://routes.googleapis.com/directions/v2:computeRoutes".into(),
            nearby_search_url: "https://places.googleapis.com/v1/places:searchNearby".into(),
            text_search_url: "https://places.googleapis.com/v1/places:searchText".into(),
            elevation_url: "https://maps.googleapis.com/maps/api/elevation/json".into(),
            weather_url: "https://weather.googleapis.com/v1/currentConditions:lookup".into(),
            insights_url: "https://areainsights.googleapis.com/v1:computeInsights".into(),
            generative_url:
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
                    .into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub search_radius_m: f64,
    pub transit_radius_m: f64,
    pub hotel_bias_radius_m: f64,
    pub max_results: u32,
    pub debounce_delay: Duration,
    pub retry: RetryConfig,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub camera: CameraRanges,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_radius_m: 3000.0,
            transit_radius_m: 200.0,
            hotel_bias_radius_m: 5000.0,
            max_results: 20,
            debounce_delay: Duration::from_millis(300),
            retry: RetryConfig::default(),
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(300),
            camera: CameraRanges::default(),
        }
    }
}

// One user-facing interest category mapped to the place types it stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "DisplayName")]
    pub display_name: String,
    pub short: String,
    pub types: Vec<String>,
}

// Read-only catalog of interest categories, loaded once per session.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    categories: BTreeMap<String, Category>,
}

impl CategoryCatalog {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let categories: BTreeMap<String, Category> =
            serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self { categories })
    }

    pub fn builtin() -> Self {
        let entries: [(&str, &str, &str, &[&str]); 6] = [
            (
                "Food & Drink",
                "🍴 Food & Drink",
                "Food & Drink",
                &["restaurant", "cafe", "bar", "bakery"],
            ),
            (
                "Culture & History",
                "🏛️ Culture & History",
                "Culture & History",
                &["museum", "historical_landmark", "art_gallery", "church"],
            ),
            (
                "Entertainment & Nightlife",
                "🎭 Entertainment & Nightlife",
                "Entertainment & Nightlife",
                &["night_club", "casino", "movie_theater", "amusement_park"],
            ),
            (
                "Nature & Outdoors",
                "🌲 Nature & Outdoors",
                "Nature & Outdoors",
                &["park", "hiking_area", "botanical_garden", "zoo"],
            ),
            (
                "Shopping",
                "🛍️ Shopping",
                "Shopping",
                &["shopping_mall", "clothing_store", "book_store", "market"],
            ),
            (
                "Relaxation & Wellness",
                "💆 Relaxation & Wellness",
                "Relaxation & Wellness",
                &["spa", "wellness_center", "beach", "yoga_studio"],
            ),
        ];

        let categories = entries
            .into_iter()
            .map(|(key, display, short, types)| {
                (
                    key.to_string(),
                    Category {
                        display_name: display.to_string(),
                        short: short.to_string(),
                        types: types.iter().map(|t| t.to_string()).collect(),
                    },
                )
            })
            .collect();

        Self { categories }
    }

    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.get(key)
    }

    pub fn by_display_name(&self, display_name: &str) -> Option<&Category> {
        self.categories
            .values()
            .find(|c| c.display_name == display_name)
    }

    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.categories.values().map(|c| c.display_name.as_str())
    }

    // Union of both categories' place types, first occurrence wins.
    pub fn combined_types(&self, first: &Category, second: &Category) -> Vec<String> {
        let mut types = Vec::new();
        for t in first.types.iter().chain(second.types.iter()) {
            if !types.contains(t) {
                types.push(t.clone());
            }
        }
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_all_six_categories() {
        let catalog = CategoryCatalog::builtin();
        assert_eq!(catalog.display_names().count(), 6);
        let food = catalog.get("Food & Drink").unwrap();
        assert_eq!(food.short, "Food & Drink");
        assert!(food.types.contains(&"restaurant".to_string()));
    }

    #[test]
    fn lookup_by_display_name() {
        let catalog = CategoryCatalog::builtin();
        let c = catalog.by_display_name("🏛️ Culture & History").unwrap();
        assert_eq!(c.short, "Culture & History");
    }

    #[test]
    fn combined_types_deduplicates() {
        let catalog = CategoryCatalog::builtin();
        let a = Category {
            display_name: "A".into(),
            short: "A".into(),
            types: vec!["museum".into(), "cafe".into()],
        };
        let b = Category {
            display_name: "B".into(),
            short: "B".into(),
            types: vec!["cafe".into(), "bar".into()],
        };
        let combined = catalog.combined_types(&a, &b);
        assert_eq!(combined, vec!["museum", "cafe", "bar"]);
    }

    #[test]
    fn catalog_loads_from_json() {
        let json = r#"{
            "Food & Drink": {
                "DisplayName": "🍴 Food & Drink",
                "short": "Food & Drink",
                "types": ["restaurant", "cafe"]
            }
        }"#;
        let catalog = CategoryCatalog::from_json(json).unwrap();
        assert_eq!(catalog.get("Food & Drink").unwrap().types.len(), 2);
    }

    #[test]
    fn malformed_catalog_json_is_a_parse_error() {
        let err = CategoryCatalog::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        let retry = RetryConfig::default();
        let first = retry.backoff(0);
        let second = retry.backoff(1);
        // Jitter is at most 10%, so the doubling always dominates.
        assert!(second > first);
        let huge = retry.backoff(20);
        assert!(huge.as_millis() as u64 <= retry.max_backoff_ms + retry.max_backoff_ms / 10);
    }
}
