// Curated destinations and the random-destination roster, each paired with
// the two interest categories it defaults to.

use rand::Rng;

use crate::app::Destination;
use crate::geo::LatLng;

#[derive(Debug, Clone, PartialEq)]
pub struct PresetDestination {
    pub destination: Destination,
    pub first_category: &'static str,
    pub second_category: &'static str,
}

fn preset(
    address: &str,
    lat: f64,
    lng: f64,
    first_category: &'static str,
    second_category: &'static str,
) -> PresetDestination {
    PresetDestination {
        destination: Destination {
            formatted_address: address.to_string(),
            location: LatLng::new(lat, lng),
        },
        first_category,
        second_category,
    }
}

/// The four destination cards shown before a search.
pub fn curated() -> Vec<PresetDestination> {
    vec![
        preset("Rome, Italy", 41.9028, 12.4964, "Food & Drink", "Culture & History"),
        preset(
            "New York City, USA",
            40.7128,
            -74.0060,
            "Entertainment & Nightlife",
            "Food & Drink",
        ),
        preset(
            "Zermatt, Switzerland",
            46.0207,
            7.7491,
            "Nature & Outdoors",
            "Relaxation & Wellness",
        ),
        preset(
            "Tokyo, Japan",
            35.67416337506583,
            139.75532420749389,
            "Shopping",
            "Entertainment & Nightlife",
        ),
    ]
}

pub fn roster() -> Vec<PresetDestination> {
    vec![
        preset(
            "Paris, France",
            48.85734310966265,
            2.342754204908419,
            "Food & Drink",
            "Culture & History",
        ),
        preset(
            "Barcelona, Spain",
            41.40035375749143,
            2.170107786934043,
            "Culture & History",
            "Entertainment & Nightlife",
        ),
        preset(
            "London, UK",
            51.510272032816374,
            -0.11514937340195888,
            "Culture & History",
            "Shopping",
        ),
        preset(
            "Sydney, Australia",
            -33.88020201354722,
            151.20889667466582,
            "Nature & Outdoors",
            "Entertainment & Nightlife",
        ),
        preset(
            "Amsterdam, Netherlands",
            52.36946530187627,
            4.895521167441979,
            "Culture & History",
            "Entertainment & Nightlife",
        ),
        preset(
            "Lisbon, Portugal",
            38.72218051946241,
            -9.140177235039712,
            "Relaxation & Wellness",
            "Food & Drink",
        ),
        preset(
            "Vienna, Austria",
            48.20803585558855,
            16.372114046058552,
            "Culture & History",
            "Relaxation & Wellness",
        ),
        preset(
            "Cape Town, South Africa",
            -33.9199108405239,
            18.413928450994916,
            "Nature & Outdoors",
            "Food & Drink",
        ),
        preset(
            "Buenos Aires, Argentina",
            -34.60301220054633,
            -58.38642833903091,
            "Entertainment & Nightlife",
            "Culture & History",
        ),
        preset(
            "San Francisco, USA",
            37.77307043309438,
            -122.42130214095383,
            "Nature & Outdoors",
            "Culture & History",
        ),
        preset(
            "Prague, Czech Republic",
            50.075382092737485,
            14.437380424838672,
            "Culture & History",
            "Relaxation & Wellness",
        ),
        preset(
            "Vancouver, Canada",
            49.28059400984349,
            -123.11639054155492,
            "Nature & Outdoors",
            "Food & Drink",
        ),
    ]
}

/// One surprise destination off the roster.
pub fn random() -> PresetDestination {
    let roster = roster();
    let index = rand::thread_rng().gen_range(0..roster.len());
    roster[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryCatalog;

    #[test]
    fn every_preset_has_valid_coordinates_and_known_categories() {
        let catalog = CategoryCatalog::builtin();
        for preset in curated().into_iter().chain(roster()) {
            preset.destination.location.validate().unwrap();
            assert!(catalog.get(preset.first_category).is_some(), "{}", preset.first_category);
            assert!(catalog.get(preset.second_category).is_some(), "{}", preset.second_category);
        }
    }

    #[test]
    fn random_pick_comes_from_the_roster() {
        let roster = roster();
        for _ in 0..20 {
            assert!(roster.contains(&random()));
        }
    }
}
