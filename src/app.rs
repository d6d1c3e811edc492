// Session state machine: destination → hotel list → selected hotel →
// AI walking route. Owns the map controller and the API client; every phase
// transition goes through here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::api::{
    AiTour, ApiClient, CurrentWeather, NearbyFeature, PlaceSummary, TourPlace, TourStop,
};
use crate::config::{AppConfig, Category, CategoryCatalog};
use crate::error::Error;
use crate::geo::LatLng;
use crate::map::{CameraPosition, MapController, MarkerId, MarkerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Idle,
    DestinationChosen,
    HotelsListed,
    HotelSelected,
    /// Camera-orbit sub-state of `HotelSelected`.
    ViewingHotel,
    AiRouteReady,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub formatted_address: String,
    pub location: LatLng,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotelDetails {
    pub place: PlaceSummary,
    pub elevation_m: f64,
    pub transit_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TourSummary {
    pub title: String,
    pub description: String,
    pub distance_text: String,
    pub duration_text: String,
    pub stops: Vec<TourStop>,
}

struct HotelEntry {
    place: PlaceSummary,
    marker: Option<MarkerId>,
}

struct FeatureEntry {
    feature: NearbyFeature,
    marker: Option<MarkerId>,
}

struct Selection {
    place: PlaceSummary,
    marker: MarkerId,
    elevation_m: f64,
    transit_count: u64,
}

struct State {
    phase: AppPhase,
    destination: Option<Destination>,
    categories: Option<(String, String)>,
    weather: Option<CurrentWeather>,
    hotels: Vec<HotelEntry>,
    selection: Option<Selection>,
    nearby: Vec<FeatureEntry>,
    selected_feature: Option<MarkerId>,
    tour: Option<TourSummary>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            phase: AppPhase::Idle,
            destination: None,
            categories: None,
            weather: None,
            hotels: Vec::new(),
            selection: None,
            nearby: Vec::new(),
            selected_feature: None,
            tour: None,
        }
    }
}

pub struct AppController {
    client: Arc<ApiClient>,
    map: Arc<Mutex<MapController>>,
    catalog: CategoryCatalog,
    config: AppConfig,
    state: Arc<Mutex<State>>,
    // Bumped on every hotel (re)selection and destination change; async
    // results carrying an older value are discarded.
    generation: Arc<AtomicU64>,
}

impl AppController {
    pub fn new(
        client: ApiClient,
        map: Arc<Mutex<MapController>>,
        catalog: CategoryCatalog,
        config: AppConfig,
    ) -> Self {
        Self {
            client: Arc::new(client),
            map,
            catalog,
            config,
            state: Arc::new(Mutex::new(State::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn phase(&self) -> AppPhase {
        self.state.lock().phase
    }

    pub fn weather(&self) -> Option<CurrentWeather> {
        self.state.lock().weather.clone()
    }

    pub fn hotels(&self) -> Vec<PlaceSummary> {
        self.state.lock().hotels.iter().map(|h| h.place.clone()).collect()
    }

    pub fn hotel_details(&self) -> Option<HotelDetails> {
        self.state.lock().selection.as_ref().map(|s| HotelDetails {
            place: s.place.clone(),
            elevation_m: s.elevation_m,
            transit_count: s.transit_count,
        })
    }

    pub fn nearby(&self) -> Vec<NearbyFeature> {
        self.state.lock().nearby.iter().map(|f| f.feature.clone()).collect()
    }

    pub fn tour(&self) -> Option<TourSummary> {
        self.state.lock().tour.clone()
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lookup_categories(&self, first: &str, second: &str) -> Result<(Category, Category), Error> {
        let resolve = |key: &str| {
            self.catalog.get(key).cloned().ok_or(Error::State {
                operation: "hotel search",
                required: "a known interest category",
            })
        };
        Ok((resolve(first)?, resolve(second)?))
    }

    fn resolve_categories(&self, state: &State) -> Result<(Category, Category), Error> {
        let (first, second) = state.categories.as_ref().ok_or(Error::State {
            operation: "hotel search",
            required: "two interest categories",
        })?;
        self.lookup_categories(first, second)
    }

    /// Restart the session at a new destination. Safe to call from any
    /// phase; wipes markers, routes and cached selection state.
    pub fn choose_destination(&self, destination: Destination) -> Result<(), Error> {
        destination.location.validate()?;
        self.bump_generation();

        {
            let mut map = self.map.lock();
            map.clear_all_routes();
            map.clear_all_markers();
            map.fly_to(
                CameraPosition::looking_at(destination.location, self.config.camera.overview),
                None,
            )?;
        }

        let mut state = self.state.lock();
        info!(address = %destination.formatted_address, "destination chosen");
        *state = State {
            phase: AppPhase::DestinationChosen,
            destination: Some(destination),
            ..State::default()
        };
        Ok(())
    }

    /// Search hotels near the destination matched against two interest
    /// categories; weather is fetched alongside and is allowed to fail.
    pub async fn search_hotels(
        &self,
        first_category: &str,
        second_category: &str,
    ) -> Result<(), Error> {
        let (first, second) = self.lookup_categories(first_category, second_category)?;
        let destination = {
            let mut state = self.state.lock();
            let destination = state.destination.clone().ok_or(Error::State {
                operation: "hotel search",
                required: "a chosen destination",
            })?;
            // Commit the pair only once both names resolved; a failed lookup
            // must not clobber a previously working selection.
            state.categories =
                Some((first_category.to_string(), second_category.to_string()));
            destination
        };

        let (hotels, weather) = futures::join!(
            self.client.search_hotels(
                &destination.formatted_address,
                destination.location,
                (&first.short, &second.short),
            ),
            self.client.weather(destination.location),
        );
        let hotels = hotels?;
        let weather = weather?;

        let entries = {
            let mut map = self.map.lock();
            map.clear_all_routes();
            map.clear_all_markers();
            let mut entries = Vec::with_capacity(hotels.len());
            for hotel in hotels {
                let marker = map.place_marker(
                    MarkerKind::HotelPin,
                    hotel.location,
                    0.0,
                    hotel.display_name.clone(),
                )?;
                entries.push(HotelEntry {
                    place: hotel,
                    marker: Some(marker),
                });
            }
            map.fly_to(
                CameraPosition::looking_at(destination.location, self.config.camera.overview),
                None,
            )?;
            entries
        };

        let mut state = self.state.lock();
        info!(count = entries.len(), "hotels listed");
        state.hotels = entries;
        state.weather = weather;
        state.selection = None;
        state.nearby.clear();
        state.selected_feature = None;
        state.tour = None;
        state.phase = AppPhase::HotelsListed;
        Ok(())
    }

    /// Focus one hotel: fetch its elevation and transit presence in
    /// parallel, then schedule the debounced nearby search.
    pub async fn select_hotel(&self, place_id: &str) -> Result<(), Error> {
        let (hotel, types) = {
            let state = self.state.lock();
            let hotel = state
                .hotels
                .iter()
                .find(|h| h.place.id == place_id)
                .map(|h| h.place.clone())
                .ok_or(Error::State {
                    operation: "hotel selection",
                    required: "a listed hotel",
                })?;
            let (first, second) = self.resolve_categories(&state)?;
            (hotel, self.catalog.combined_types(&first, &second))
        };

        let generation = self.bump_generation();

        {
            let mut map = self.map.lock();
            map.clear_all_routes();
            map.clear_all_markers();
        }
        {
            let mut state = self.state.lock();
            for entry in &mut state.hotels {
                entry.marker = None;
            }
            state.nearby.clear();
            state.selected_feature = None;
            state.tour = None;
        }

        let (elevation, transit) = futures::join!(
            self.client.elevation(hotel.location),
            self.client.transit_count(hotel.location),
        );
        let elevation_m = elevation?;
        let transit_count = match transit {
            Ok(count) => count,
            Err(err) => {
                error!(%err, "transit lookup failed");
                0
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "hotel selection superseded, dropping");
            return Ok(());
        }

        let marker = {
            let mut map = self.map.lock();
            let marker = map.place_marker(
                MarkerKind::HotelPin,
                hotel.location,
                elevation_m,
                hotel.display_name.clone(),
            )?;
            map.fly_to(
                CameraPosition::looking_at(hotel.location, self.config.camera.detail),
                None,
            )?;
            marker
        };

        {
            let mut state = self.state.lock();
            info!(hotel = %hotel.display_name, elevation_m, transit_count, "hotel selected");
            state.selection = Some(Selection {
                place: hotel.clone(),
                marker,
                elevation_m,
                transit_count,
            });
            state.phase = AppPhase::HotelSelected;
        }

        self.schedule_nearby_search(generation, hotel.location, types);
        Ok(())
    }

    // Debounce without cancellation: the task sleeps out the window, then
    // dispatches only if it is still the newest selection, and applies the
    // reply only if that is still true afterwards.
    fn schedule_nearby_search(&self, generation: u64, center: LatLng, types: Vec<String>) {
        let client = self.client.clone();
        let map = self.map.clone();
        let state = self.state.clone();
        let current = self.generation.clone();
        let delay = self.config.debounce_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!(generation, "debounced nearby search superseded before dispatch");
                return;
            }

            let features = match client.search_nearby(center, &types).await {
                Ok(features) => features,
                Err(err) => {
                    error!(%err, "nearby search failed");
                    return;
                }
            };
            if current.load(Ordering::SeqCst) != generation {
                debug!(generation, "stale nearby results discarded");
                return;
            }

            let entries = {
                let mut map = map.lock();
                let mut entries = Vec::with_capacity(features.len());
                for feature in features {
                    match map.place_marker(
                        MarkerKind::FeaturePin,
                        feature.location,
                        0.0,
                        feature.display_name.clone(),
                    ) {
                        Ok(marker) => entries.push(FeatureEntry {
                            feature,
                            marker: Some(marker),
                        }),
                        Err(err) => error!(%err, "feature marker placement failed"),
                    }
                }
                entries
            };

            let mut state = state.lock();
            debug!(count = entries.len(), "nearby features placed");
            state.nearby = entries;
        });
    }

    /// Toggle a nearby feature. Selecting it draws a walking route from the
    /// hotel; selecting it again removes the route and orbits the hotel.
    pub async fn select_feature(&self, feature_id: &str) -> Result<(), Error> {
        let (hotel_pos, feature, marker, previously_selected) = {
            let state = self.state.lock();
            let selection = state.selection.as_ref().ok_or(Error::State {
                operation: "feature selection",
                required: "a selected hotel",
            })?;
            let entry = state
                .nearby
                .iter()
                .find(|f| f.feature.id == feature_id)
                .ok_or(Error::State {
                    operation: "feature selection",
                    required: "a nearby feature",
                })?;
            let marker = entry.marker.ok_or(Error::State {
                operation: "feature selection",
                required: "a visible feature marker",
            })?;
            (
                selection.place.location,
                entry.feature.clone(),
                marker,
                state.selected_feature,
            )
        };

        if previously_selected == Some(marker) {
            let mut map = self.map.lock();
            map.restore_label(marker)?;
            map.clear_route(marker);
            let orbit = CameraPosition::looking_at(hotel_pos, self.config.camera.close_up);
            map.fly_to(orbit, Some(orbit))?;
            drop(map);

            let mut state = self.state.lock();
            state.selected_feature = None;
            state.phase = AppPhase::ViewingHotel;
            return Ok(());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let route = self
            .client
            .compute_route(hotel_pos, feature.location, &[])
            .await?;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("feature route arrived after reselection, dropping");
            return Ok(());
        }

        {
            let mut map = self.map.lock();
            if let Some(previous) = previously_selected {
                map.restore_label(previous)?;
            }
            map.clear_all_routes();
            map.set_route(marker, route)?;
            map.set_label(marker, format!("⭐ {}", feature.display_name))?;
            let midpoint = LatLng::new(
                (hotel_pos.lat + feature.location.lat) / 2.0,
                (hotel_pos.lng + feature.location.lng) / 2.0,
            );
            map.fly_to(
                CameraPosition::looking_at(midpoint, self.config.camera.detail),
                None,
            )?;
        }

        let mut state = self.state.lock();
        state.selected_feature = Some(marker);
        state.phase = AppPhase::HotelSelected;
        Ok(())
    }

    /// Ask the model for a curated tour over the nearby features, compute an
    /// order-optimized walking loop from the hotel and render it. The
    /// provider's optimized waypoint order is authoritative for the stop
    /// numbering.
    pub async fn generate_ai_route(&self) -> Result<TourSummary, Error> {
        let (hotel, places, first, second) = {
            let state = self.state.lock();
            let selection = state.selection.as_ref().ok_or(Error::State {
                operation: "route generation",
                required: "a selected hotel",
            })?;
            if state.nearby.is_empty() {
                return Err(Error::State {
                    operation: "route generation",
                    required: "nearby places to route through",
                });
            }
            let places: Vec<TourPlace> = state
                .nearby
                .iter()
                .map(|f| TourPlace {
                    name: f.feature.display_name.clone(),
                    place_type: f.feature.primary_type.clone(),
                    place_id: f.feature.id.clone(),
                    location: f.feature.location,
                })
                .collect();
            let (first, second) = self.resolve_categories(&state)?;
            (
                (selection.place.location, selection.marker),
                places,
                first,
                second,
            )
        };
        let (hotel_pos, hotel_marker) = hotel;

        let generation = self.generation.load(Ordering::SeqCst);
        let tour = self.client.generate_tour(&places, (&first, &second)).await?;
        if tour.stops.is_empty() {
            return Err(Error::RouteGeneration);
        }

        let waypoints: Vec<LatLng> = tour.stops.iter().map(|s| s.location).collect();
        let route = self
            .client
            .compute_route(hotel_pos, hotel_pos, &waypoints)
            .await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(Error::State {
                operation: "route generation",
                required: "an unchanged hotel selection",
            });
        }

        let (title, description, ordered) = reorder_stops(tour, &route.optimized_order);
        let summary = TourSummary {
            title,
            description,
            distance_text: route.distance_text.clone(),
            duration_text: route.duration_text.clone(),
            stops: ordered,
        };

        {
            let mut map = self.map.lock();
            map.remove_markers_of_kind(MarkerKind::FeaturePin);
            for (index, stop) in summary.stops.iter().enumerate() {
                map.place_marker(
                    MarkerKind::RouteStopPin,
                    stop.location,
                    0.0,
                    format!("{}. {}", index + 1, stop.name),
                )?;
            }
            let frame = route
                .viewport
                .as_ref()
                .map(|v| v.center())
                .unwrap_or(hotel_pos);
            map.set_route(hotel_marker, route)?;
            map.fly_to(
                CameraPosition::looking_at(frame, self.config.camera.overview),
                None,
            )?;
        }

        let mut state = self.state.lock();
        info!(title = %summary.title, stops = summary.stops.len(), "AI route ready");
        for entry in &mut state.nearby {
            entry.marker = None;
        }
        state.selected_feature = None;
        state.tour = Some(summary.clone());
        state.phase = AppPhase::AiRouteReady;
        Ok(summary)
    }

    /// Leave the AI route view, restoring the nearby feature pins from
    /// memory. No refetch.
    pub fn back_to_hotel(&self) -> Result<(), Error> {
        let (hotel_pos, features) = {
            let state = self.state.lock();
            let selection = state.selection.as_ref().ok_or(Error::State {
                operation: "back to hotel",
                required: "a selected hotel",
            })?;
            let features: Vec<NearbyFeature> =
                state.nearby.iter().map(|f| f.feature.clone()).collect();
            (selection.place.location, features)
        };

        let markers = {
            let mut map = self.map.lock();
            map.clear_all_routes();
            map.remove_markers_of_kind(MarkerKind::RouteStopPin);
            let mut markers = Vec::with_capacity(features.len());
            for feature in &features {
                markers.push(map.place_marker(
                    MarkerKind::FeaturePin,
                    feature.location,
                    0.0,
                    feature.display_name.clone(),
                )?);
            }
            map.fly_to(
                CameraPosition::looking_at(hotel_pos, self.config.camera.detail),
                None,
            )?;
            markers
        };

        let mut state = self.state.lock();
        for (entry, marker) in state.nearby.iter_mut().zip(markers) {
            entry.marker = Some(marker);
        }
        state.tour = None;
        state.phase = AppPhase::HotelSelected;
        Ok(())
    }

    /// Drop the selection and restore the full hotel list from memory.
    pub fn back_to_all_hotels(&self) -> Result<(), Error> {
        let (destination, hotels) = {
            let state = self.state.lock();
            let destination = state.destination.clone().ok_or(Error::State {
                operation: "back to all hotels",
                required: "a chosen destination",
            })?;
            let hotels: Vec<PlaceSummary> =
                state.hotels.iter().map(|h| h.place.clone()).collect();
            (destination, hotels)
        };

        self.bump_generation();

        let markers = {
            let mut map = self.map.lock();
            map.clear_all_routes();
            map.clear_all_markers();
            let mut markers = Vec::with_capacity(hotels.len());
            for hotel in &hotels {
                markers.push(map.place_marker(
                    MarkerKind::HotelPin,
                    hotel.location,
                    0.0,
                    hotel.display_name.clone(),
                )?);
            }
            map.fly_to(
                CameraPosition::looking_at(destination.location, self.config.camera.overview),
                None,
            )?;
            markers
        };

        let mut state = self.state.lock();
        for (entry, marker) in state.hotels.iter_mut().zip(markers) {
            entry.marker = Some(marker);
        }
        state.selection = None;
        state.nearby.clear();
        state.selected_feature = None;
        state.tour = None;
        state.phase = AppPhase::HotelsListed;
        Ok(())
    }

    /// Reframe the camera on whatever the session is looking at.
    pub fn reset_camera(&self) -> Result<(), Error> {
        let destination = self.state.lock().destination.clone();
        let camera = match destination {
            Some(dest) => CameraPosition::looking_at(dest.location, self.config.camera.overview),
            None => CameraPosition::looking_at(
                LatLng::new(0.0, 0.0),
                self.config.camera.super_overview,
            ),
        };
        self.map.lock().fly_to(camera, None)
    }
}

// Applies the provider's optimized waypoint order to the AI stop list. A
// malformed index array keeps the original order.
fn reorder_stops(tour: AiTour, order: &Option<Vec<usize>>) -> (String, String, Vec<TourStop>) {
    let AiTour {
        route_title,
        route_description,
        stops,
    } = tour;

    let stops = match order {
        Some(order)
            if order.len() == stops.len()
                && order.iter().all(|&i| i < stops.len()) =>
        {
            order.iter().map(|&i| stops[i].clone()).collect()
        }
        Some(order) => {
            error!(?order, stops = stops.len(), "unusable waypoint order, keeping AI order");
            stops
        }
        None => stops,
    };

    (route_title, route_description, stops)
}
