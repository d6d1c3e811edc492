use serde::{Deserialize, Serialize};

use crate::error::Error;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.lat.abs() > 90.0 || self.lng.abs() > 180.0 || !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(Error::InvalidLocation {
                lat: self.lat,
                lng: self.lng,
            });
        }
        Ok(())
    }

    pub fn distance_m(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    // Great-circle offset by `distance_m` along `heading_deg` (clockwise from north).
    pub fn offset(&self, distance_m: f64, heading_deg: f64) -> Self {
        let ang = distance_m / EARTH_RADIUS_M;
        let heading = heading_deg.to_radians();
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();

        let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * heading.cos()).asin();
        let lng2 = lng1
            + (heading.sin() * ang.sin() * lat1.cos()).atan2(ang.cos() - lat1.sin() * lat2.sin());

        Self {
            lat: lat2.to_degrees(),
            lng: lng2.to_degrees(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub sw: LatLng,
    pub ne: LatLng,
}

impl LatLngBounds {
    // Square bounds around a center point, computed along the NE/SW diagonals.
    pub fn from_center_and_radius(center: LatLng, radius_m: f64) -> Self {
        let diagonal = radius_m * std::f64::consts::SQRT_2;
        Self {
            ne: center.offset(diagonal, 45.0),
            sw: center.offset(diagonal, 225.0),
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.ne.lat + self.sw.lat) / 2.0,
            lng: (self.ne.lng + self.sw.lng) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, 0.0; "origin")]
    #[test_case(90.0, 180.0; "upper corner")]
    #[test_case(-90.0, -180.0; "lower corner")]
    #[test_case(48.8573, 2.3427; "paris")]
    fn valid_coordinates_pass(lat: f64, lng: f64) {
        assert!(LatLng::new(lat, lng).validate().is_ok());
    }

    #[test_case(90.0001, 0.0; "lat above range")]
    #[test_case(-90.0001, 0.0; "lat below range")]
    #[test_case(0.0, 180.0001; "lng above range")]
    #[test_case(0.0, -180.0001; "lng below range")]
    #[test_case(f64::NAN, 0.0; "nan lat")]
    fn out_of_range_coordinates_fail(lat: f64, lng: f64) {
        let err = LatLng::new(lat, lng).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidLocation { .. }));
    }

    #[test]
    fn haversine_paris_to_london() {
        let paris = LatLng::new(48.8573, 2.3427);
        let london = LatLng::new(51.5052, -0.1249);
        let d = paris.distance_m(&london);
        assert!((d - 343_000.0).abs() < 3_000.0, "got {d}");
    }

    #[test]
    fn bounds_span_the_requested_radius() {
        let center = LatLng::new(41.9028, 12.4964);
        let bounds = LatLngBounds::from_center_and_radius(center, 5_000.0);

        assert!(bounds.ne.lat > center.lat && bounds.ne.lng > center.lng);
        assert!(bounds.sw.lat < center.lat && bounds.sw.lng < center.lng);
        // The diagonal corner sits radius * sqrt(2) away.
        let corner_dist = center.distance_m(&bounds.ne);
        assert!((corner_dist - 5_000.0 * std::f64::consts::SQRT_2).abs() < 50.0);
        // Midpoint of the corners lands back on the center.
        let mid = bounds.center();
        assert!(center.distance_m(&mid) < 10.0);
    }
}
