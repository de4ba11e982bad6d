//! Great-circle distance and the bundled settlement dataset used for
//! offline nearest-city resolution.

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::Location;

/// Mean Earth radius used by the haversine crate for kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres
#[must_use]
pub fn haversine_km(from: &Location, to: &Location) -> f64 {
    let from_haversine = HaversineLocation {
        latitude: from.latitude,
        longitude: from.longitude,
    };
    let to_haversine = HaversineLocation {
        latitude: to.latitude,
        longitude: to.longitude,
    };
    distance(from_haversine, to_haversine, Units::Kilometers)
}

/// A named settlement with its coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub name: &'static str,
    pub country: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl Settlement {
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude, Some(self.display_name()))
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

macro_rules! settlement {
    ($name:expr, $country:expr, $lat:expr, $lon:expr) => {
        Settlement {
            name: $name,
            country: $country,
            latitude: $lat,
            longitude: $lon,
        }
    };
}

/// Major world settlements
pub static SETTLEMENTS: &[Settlement] = &[
    settlement!("London", "United Kingdom", 51.5074, -0.1278),
    settlement!("Paris", "France", 48.8566, 2.3522),
    settlement!("Berlin", "Germany", 52.5200, 13.4050),
    settlement!("Madrid", "Spain", 40.4168, -3.7038),
    settlement!("Lisbon", "Portugal", 38.7223, -9.1393),
    settlement!("Rome", "Italy", 41.9028, 12.4964),
    settlement!("Athens", "Greece", 37.9838, 23.7275),
    settlement!("Vienna", "Austria", 48.2082, 16.3738),
    settlement!("Zurich", "Switzerland", 47.3769, 8.5417),
    settlement!("Amsterdam", "Netherlands", 52.3676, 4.9041),
    settlement!("Stockholm", "Sweden", 59.3293, 18.0686),
    settlement!("Oslo", "Norway", 59.9139, 10.7522),
    settlement!("Helsinki", "Finland", 60.1699, 24.9384),
    settlement!("Warsaw", "Poland", 52.2297, 21.0122),
    settlement!("Istanbul", "Turkey", 41.0082, 28.9784),
    settlement!("Moscow", "Russia", 55.7558, 37.6173),
    settlement!("Cairo", "Egypt", 30.0444, 31.2357),
    settlement!("Lagos", "Nigeria", 6.5244, 3.3792),
    settlement!("Nairobi", "Kenya", -1.2921, 36.8219),
    settlement!("Johannesburg", "South Africa", -26.2041, 28.0473),
    settlement!("Cape Town", "South Africa", -33.9249, 18.4241),
    settlement!("Dubai", "United Arab Emirates", 25.2048, 55.2708),
    settlement!("Riyadh", "Saudi Arabia", 24.7136, 46.6753),
    settlement!("Tehran", "Iran", 35.6892, 51.3890),
    settlement!("Karachi", "Pakistan", 24.8607, 67.0011),
    settlement!("Delhi", "India", 28.7041, 77.1025),
    settlement!("Mumbai", "India", 19.0760, 72.8777),
    settlement!("Bengaluru", "India", 12.9716, 77.5946),
    settlement!("Chennai", "India", 13.0827, 80.2707),
    settlement!("Kolkata", "India", 22.5726, 88.3639),
    settlement!("Dhaka", "Bangladesh", 23.8103, 90.4125),
    settlement!("Kathmandu", "Nepal", 27.7172, 85.3240),
    settlement!("Bangkok", "Thailand", 13.7563, 100.5018),
    settlement!("Singapore", "Singapore", 1.3521, 103.8198),
    settlement!("Jakarta", "Indonesia", -6.2088, 106.8456),
    settlement!("Manila", "Philippines", 14.5995, 120.9842),
    settlement!("Hong Kong", "China", 22.3193, 114.1694),
    settlement!("Shanghai", "China", 31.2304, 121.4737),
    settlement!("Beijing", "China", 39.9042, 116.4074),
    settlement!("Seoul", "South Korea", 37.5665, 126.9780),
    settlement!("Tokyo", "Japan", 35.6762, 139.6503),
    settlement!("Osaka", "Japan", 34.6937, 135.5023),
    settlement!("Sydney", "Australia", -33.8688, 151.2093),
    settlement!("Melbourne", "Australia", -37.8136, 144.9631),
    settlement!("Perth", "Australia", -31.9505, 115.8605),
    settlement!("Auckland", "New Zealand", -36.8485, 174.7633),
    settlement!("Honolulu", "United States", 21.3069, -157.8583),
    settlement!("Anchorage", "United States", 61.2181, -149.9003),
    settlement!("Vancouver", "Canada", 49.2827, -123.1207),
    settlement!("San Francisco", "United States", 37.7749, -122.4194),
    settlement!("Los Angeles", "United States", 34.0522, -118.2437),
    settlement!("Denver", "United States", 39.7392, -104.9903),
    settlement!("Chicago", "United States", 41.8781, -87.6298),
    settlement!("Houston", "United States", 29.7604, -95.3698),
    settlement!("Miami", "United States", 25.7617, -80.1918),
    settlement!("New York", "United States", 40.7128, -74.0060),
    settlement!("Toronto", "Canada", 43.6532, -79.3832),
    settlement!("Montreal", "Canada", 45.5017, -73.5673),
    settlement!("Mexico City", "Mexico", 19.4326, -99.1332),
    settlement!("Bogota", "Colombia", 4.7110, -74.0721),
    settlement!("Lima", "Peru", -12.0464, -77.0428),
    settlement!("Santiago", "Chile", -33.4489, -70.6693),
    settlement!("Buenos Aires", "Argentina", -34.6037, -58.3816),
    settlement!("Sao Paulo", "Brazil", -23.5505, -46.6333),
    settlement!("Rio de Janeiro", "Brazil", -22.9068, -43.1729),
    settlement!("Reykjavik", "Iceland", 64.1466, -21.9426),
];

/// Nearest settlement to `point` and its distance in kilometres
#[must_use]
pub fn nearest_settlement<'a>(
    point: &Location,
    settlements: &'a [Settlement],
) -> Option<(&'a Settlement, f64)> {
    settlements
        .iter()
        .map(|s| (s, haversine_km(point, &s.location())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Settlement whose name matches `name`, ignoring case and anything after a comma
#[must_use]
pub fn settlement_named<'a>(name: &str, settlements: &'a [Settlement]) -> Option<&'a Settlement> {
    let wanted = name.split(',').next().unwrap_or(name).trim();
    settlements
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(wanted))
}
