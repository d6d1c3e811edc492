// Map state: markers, per-marker polylines, camera moves. Rendering goes
// through the `MapSurface` seam so the whole controller runs headless in
// tests.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::RouteResult;
use crate::error::Error;
use crate::geo::LatLng;

pub type MarkerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    HotelPin,
    FeaturePin,
    RouteStopPin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub kind: MarkerKind,
    pub position: LatLng,
    pub altitude_m: f64,
    pub label: String,
    /// Label without selection decoration, kept for restores.
    pub base_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub center: LatLng,
    pub range_m: f64,
    pub tilt_deg: f64,
    pub heading_deg: f64,
}

impl CameraPosition {
    pub fn looking_at(center: LatLng, range_m: f64) -> Self {
        Self {
            center,
            range_m,
            tilt_deg: 45.0,
            heading_deg: 0.0,
        }
    }
}

/// Rendering seam. `attach_marker` upserts: re-attaching an id the surface
/// already holds refreshes its position and label.
pub trait MapSurface: Send + Sync {
    fn attach_marker(&self, marker: &Marker) -> Result<(), Error>;
    fn detach_marker(&self, id: MarkerId) -> Result<(), Error>;
    fn attach_polyline(&self, key: MarkerId, route: &RouteResult) -> Result<(), Error>;
    fn detach_polyline(&self, key: MarkerId) -> Result<(), Error>;
    fn fly_to(&self, camera: CameraPosition) -> Result<(), Error>;
    fn fly_around(&self, camera: CameraPosition) -> Result<(), Error>;
}

// Free lists per kind, bounded so a burst of releases cannot hoard markers
// forever. Acquire hands back a fully reset marker.
pub struct MarkerPool {
    per_kind_cap: usize,
    free: HashMap<MarkerKind, Vec<Marker>>,
    next_id: MarkerId,
}

impl MarkerPool {
    pub fn new(per_kind_cap: usize) -> Self {
        Self {
            per_kind_cap,
            free: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn acquire(
        &mut self,
        kind: MarkerKind,
        position: LatLng,
        altitude_m: f64,
        label: String,
    ) -> Marker {
        let id = match self.free.get_mut(&kind).and_then(Vec::pop) {
            Some(recycled) => recycled.id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        Marker {
            id,
            kind,
            position,
            altitude_m,
            base_label: label.clone(),
            label,
        }
    }

    // Beyond the cap the marker is simply dropped.
    pub fn release(&mut self, marker: Marker) {
        let free = self.free.entry(marker.kind).or_default();
        if free.len() < self.per_kind_cap {
            free.push(marker);
        }
    }

    #[cfg(test)]
    fn free_count(&self, kind: MarkerKind) -> usize {
        self.free.get(&kind).map_or(0, Vec::len)
    }
}

const POOL_CAP_PER_KIND: usize = 50;

pub struct MapController {
    surface: Arc<dyn MapSurface>,
    pool: MarkerPool,
    markers: HashMap<MarkerId, Marker>,
    routes: HashMap<MarkerId, RouteResult>,
    pending_orbit: Option<CameraPosition>,
}

impl MapController {
    pub fn new(surface: Arc<dyn MapSurface>) -> Self {
        Self {
            surface,
            pool: MarkerPool::new(POOL_CAP_PER_KIND),
            markers: HashMap::new(),
            routes: HashMap::new(),
            pending_orbit: None,
        }
    }

    pub fn place_marker(
        &mut self,
        kind: MarkerKind,
        position: LatLng,
        altitude_m: f64,
        label: String,
    ) -> Result<MarkerId, Error> {
        let marker = self.pool.acquire(kind, position, altitude_m, label);
        self.surface.attach_marker(&marker)?;
        let id = marker.id;
        self.markers.insert(id, marker);
        Ok(id)
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn markers_of_kind(&self, kind: MarkerKind) -> impl Iterator<Item = &Marker> {
        self.markers.values().filter(move |m| m.kind == kind)
    }

    pub fn set_label(&mut self, id: MarkerId, label: String) -> Result<(), Error> {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.label = label;
            self.surface.attach_marker(marker)?;
        }
        Ok(())
    }

    pub fn restore_label(&mut self, id: MarkerId) -> Result<(), Error> {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.label = marker.base_label.clone();
            self.surface.attach_marker(marker)?;
        }
        Ok(())
    }

    // Removing a marker also drops any route keyed by it. Idempotent.
    pub fn remove_marker(&mut self, id: MarkerId) {
        self.clear_route(id);
        if let Some(marker) = self.markers.remove(&id) {
            if let Err(err) = self.surface.detach_marker(id) {
                warn!(id, %err, "marker detach failed, continuing");
            }
            self.pool.release(marker);
        }
    }

    pub fn remove_markers_of_kind(&mut self, kind: MarkerKind) {
        let ids: Vec<MarkerId> = self
            .markers
            .values()
            .filter(|m| m.kind == kind)
            .map(|m| m.id)
            .collect();
        for id in ids {
            self.remove_marker(id);
        }
    }

    pub fn clear_all_markers(&mut self) {
        let ids: Vec<MarkerId> = self.markers.keys().copied().collect();
        for id in ids {
            self.remove_marker(id);
        }
    }

    // One polyline per owning marker; setting again replaces.
    pub fn set_route(&mut self, key: MarkerId, route: RouteResult) -> Result<(), Error> {
        if self.routes.contains_key(&key) {
            self.clear_route(key);
        }
        self.surface.attach_polyline(key, &route)?;
        self.routes.insert(key, route);
        Ok(())
    }

    pub fn route(&self, key: MarkerId) -> Option<&RouteResult> {
        self.routes.get(&key)
    }

    pub fn clear_route(&mut self, key: MarkerId) {
        if self.routes.remove(&key).is_some() {
            if let Err(err) = self.surface.detach_polyline(key) {
                warn!(key, %err, "polyline detach failed, continuing");
            }
        }
    }

    pub fn clear_all_routes(&mut self) {
        let keys: Vec<MarkerId> = self.routes.keys().copied().collect();
        for key in keys {
            self.clear_route(key);
        }
    }

    /// Fly the camera; at most one orbit may be pending, and a newer fly-to
    /// replaces it.
    pub fn fly_to(
        &mut self,
        camera: CameraPosition,
        then_orbit: Option<CameraPosition>,
    ) -> Result<(), Error> {
        self.pending_orbit = then_orbit;
        self.surface.fly_to(camera)
    }

    pub fn animation_ended(&mut self) {
        if let Some(camera) = self.pending_orbit.take() {
            debug!("starting pending orbit");
            if let Err(err) = self.surface.fly_around(camera) {
                warn!(%err, "orbit start failed, continuing");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{RecordingSurface, SurfaceEvent};
    use super::*;

    fn route(polyline: &str) -> RouteResult {
        RouteResult {
            encoded_polyline: polyline.into(),
            distance_text: "1 km".into(),
            duration_text: "12 mins".into(),
            optimized_order: None,
            viewport: None,
        }
    }

    fn controller() -> (MapController, Arc<RecordingSurface>) {
        let surface = RecordingSurface::new();
        (MapController::new(surface.clone()), surface)
    }

    #[test]
    fn marker_round_trip_and_idempotent_removal() {
        let (mut map, surface) = controller();
        let id = map
            .place_marker(MarkerKind::HotelPin, LatLng::new(48.0, 2.0), 10.0, "Hotel".into())
            .unwrap();
        assert!(map.marker(id).is_some());

        map.remove_marker(id);
        map.remove_marker(id);

        let detaches = surface
            .events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::MarkerDetached(_)))
            .count();
        assert_eq!(detaches, 1);
        assert!(map.marker(id).is_none());
    }

    #[test]
    fn released_marker_is_reused_with_fresh_label() {
        let (mut map, _surface) = controller();
        let id = map
            .place_marker(MarkerKind::FeaturePin, LatLng::new(1.0, 1.0), 0.0, "Cafe".into())
            .unwrap();
        map.set_label(id, "⭐ Cafe".into()).unwrap();
        map.remove_marker(id);

        let reused = map
            .place_marker(MarkerKind::FeaturePin, LatLng::new(2.0, 2.0), 0.0, "Museum".into())
            .unwrap();
        assert_eq!(reused, id);
        let marker = map.marker(reused).unwrap();
        assert_eq!(marker.label, "Museum");
        assert_eq!(marker.base_label, "Museum");
        assert_eq!(marker.position, LatLng::new(2.0, 2.0));
    }

    #[test]
    fn release_beyond_cap_drops_the_marker() {
        let mut pool = MarkerPool::new(1);
        let a = pool.acquire(MarkerKind::RouteStopPin, LatLng::new(0.0, 0.0), 0.0, "1".into());
        let b = pool.acquire(MarkerKind::RouteStopPin, LatLng::new(0.0, 0.0), 0.0, "2".into());
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.free_count(MarkerKind::RouteStopPin), 1);
    }

    #[test]
    fn setting_a_route_twice_replaces_the_polyline() {
        let (mut map, surface) = controller();
        let key = map
            .place_marker(MarkerKind::FeaturePin, LatLng::new(1.0, 1.0), 0.0, "Cafe".into())
            .unwrap();

        map.set_route(key, route("first")).unwrap();
        map.set_route(key, route("second")).unwrap();

        assert_eq!(map.route(key).unwrap().encoded_polyline, "second");
        let events = surface.events();
        let attach_count = events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::PolylineAttached(_)))
            .count();
        let detach_count = events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::PolylineDetached(_)))
            .count();
        assert_eq!(attach_count, 2);
        assert_eq!(detach_count, 1);
    }

    #[test]
    fn clearing_routes_twice_is_harmless() {
        let (mut map, surface) = controller();
        let key = map
            .place_marker(MarkerKind::FeaturePin, LatLng::new(1.0, 1.0), 0.0, "Cafe".into())
            .unwrap();
        map.set_route(key, route("p")).unwrap();

        map.clear_all_routes();
        map.clear_all_routes();
        map.clear_route(key);

        let detaches = surface
            .events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::PolylineDetached(_)))
            .count();
        assert_eq!(detaches, 1);
    }

    #[test]
    fn clearing_all_markers_twice_is_harmless() {
        let (mut map, surface) = controller();
        map.place_marker(MarkerKind::HotelPin, LatLng::new(1.0, 1.0), 0.0, "A".into())
            .unwrap();
        map.place_marker(MarkerKind::FeaturePin, LatLng::new(2.0, 2.0), 0.0, "B".into())
            .unwrap();

        map.clear_all_markers();
        map.clear_all_markers();

        let detaches = surface
            .events()
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::MarkerDetached(_)))
            .count();
        assert_eq!(detaches, 2);
    }

    #[test]
    fn failed_detach_is_swallowed_and_state_still_clears() {
        let (mut map, surface) = controller();
        let key = map
            .place_marker(MarkerKind::FeaturePin, LatLng::new(1.0, 1.0), 0.0, "Cafe".into())
            .unwrap();
        map.set_route(key, route("p")).unwrap();

        surface.fail_next_detach();
        map.clear_route(key);

        assert!(map.route(key).is_none());
    }

    #[test]
    fn newer_fly_to_replaces_the_pending_orbit() {
        let (mut map, surface) = controller();
        let first = CameraPosition::looking_at(LatLng::new(1.0, 1.0), 250.0);
        let second = CameraPosition::looking_at(LatLng::new(2.0, 2.0), 250.0);

        map.fly_to(CameraPosition::looking_at(LatLng::new(1.0, 1.0), 4000.0), Some(first))
            .unwrap();
        map.fly_to(CameraPosition::looking_at(LatLng::new(2.0, 2.0), 4000.0), Some(second))
            .unwrap();
        map.animation_ended();
        map.animation_ended();

        let orbits: Vec<_> = surface
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::FlewAround(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(orbits, vec![second]);
    }

    #[test]
    fn fly_to_without_orbit_clears_a_stale_pending_one() {
        let (mut map, surface) = controller();
        let orbit = CameraPosition::looking_at(LatLng::new(1.0, 1.0), 250.0);

        map.fly_to(CameraPosition::looking_at(LatLng::new(1.0, 1.0), 4000.0), Some(orbit))
            .unwrap();
        map.fly_to(CameraPosition::looking_at(LatLng::new(2.0, 2.0), 10_000.0), None)
            .unwrap();
        map.animation_ended();

        assert!(!surface
            .events()
            .iter()
            .any(|e| matches!(e, SurfaceEvent::FlewAround(_))));
    }
}
