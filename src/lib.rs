// Main library file for the hotel atlas exploration engine

// Export one module per concern
pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod map;
pub mod presets;
pub mod wire;

// Re-export key types for convenience
pub use api::{
    AiTour, ApiClient, CurrentWeather, HttpTransport, NearbyFeature, PlaceSummary, RouteResult,
    TourPlace, TourStop, Transport,
};
pub use app::{AppController, AppPhase, Destination, HotelDetails, TourSummary};
pub use cache::{ApiCache, CacheStatsReport};
pub use config::{ApiConfig, AppConfig, CameraRanges, Category, CategoryCatalog, RetryConfig};
pub use error::Error;
pub use geo::{LatLng, LatLngBounds};
pub use map::{CameraPosition, MapController, MapSurface, Marker, MarkerId, MarkerKind, MarkerPool};
pub use presets::PresetDestination;
