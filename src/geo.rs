//! Geocoding seam and spherical distance helpers.

use bson::{Bson, Document as BsonDocument, doc};
use serde::Deserialize;
use std::path::Path;

/// Earth radius in miles; radius searches express distance as `miles / EARTH_RADIUS_MILES`.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Angular distance in radians between two `(longitude, latitude)` points in degrees.
#[must_use]
pub fn central_angle(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lng2 - lng1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// GeoJSON point plus the address parts the geocoder resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub formatted_address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
}

impl GeoPoint {
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        doc! {
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
            "formattedAddress": self.formatted_address.as_str(),
            "street": self.street.as_str(),
            "city": self.city.as_str(),
            "state": self.state.as_str(),
            "zipcode": self.zipcode.as_str(),
            "country": self.country.as_str(),
        }
    }

    #[must_use]
    pub fn from_document(d: &BsonDocument) -> Option<Self> {
        let coords = d.get_array("coordinates").ok()?;
        let num = |b: &Bson| match b {
            Bson::Double(f) => Some(*f),
            Bson::Int32(i) => Some(f64::from(*i)),
            Bson::Int64(i) => Some(*i as f64),
            _ => None,
        };
        let text = |k: &str| d.get_str(k).unwrap_or_default().to_string();
        Some(Self {
            longitude: num(coords.first()?)?,
            latitude: num(coords.get(1)?)?,
            formatted_address: text("formattedAddress"),
            street: text("street"),
            city: text("city"),
            state: text("state"),
            zipcode: text("zipcode"),
            country: text("country"),
        })
    }
}

pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str) -> Option<GeoPoint>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceEntry {
    pub zipcode: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub formatted_address: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// Resolves addresses from a fixed table of places keyed by zipcode.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: Vec<PlaceEntry>,
}

impl StaticGeocoder {
    #[must_use]
    pub fn new(places: Vec<PlaceEntry>) -> Self {
        Self { places }
    }

    /// Loads a JSON array of places.
    ///
    /// # Errors
    /// Fails when the file cannot be read or is not a valid place list.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let places: Vec<PlaceEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self::new(places))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

fn contains_token(haystack: &str, token: &str) -> bool {
    haystack
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(token))
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, query: &str) -> Option<GeoPoint> {
        let query = query.trim();
        let place = self
            .places
            .iter()
            .find(|p| p.zipcode == query)
            .or_else(|| self.places.iter().find(|p| contains_token(query, &p.zipcode)))?;
        let formatted_address = if place.formatted_address.is_empty() {
            format!("{}, {}, {} {}, {}", place.street, place.city, place.state, place.zipcode, place.country)
        } else {
            place.formatted_address.clone()
        };
        Some(GeoPoint {
            longitude: place.longitude,
            latitude: place.latitude,
            formatted_address,
            street: place.street.clone(),
            city: place.city.clone(),
            state: place.state.clone(),
            zipcode: place.zipcode.clone(),
            country: place.country.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boston() -> PlaceEntry {
        PlaceEntry {
            zipcode: "02118".into(),
            street: "233 Bay State Rd".into(),
            city: "Boston".into(),
            state: "MA".into(),
            country: "US".into(),
            latitude: 42.350_19,
            longitude: -71.105_76,
            formatted_address: String::new(),
        }
    }

    #[test]
    fn resolves_zip_inside_address() {
        let g = StaticGeocoder::new(vec![boston()]);
        let p = g.geocode("233 Bay State Rd Boston MA 02118").unwrap();
        assert_eq!(p.city, "Boston");
        assert!(p.formatted_address.contains("02118"));
        assert!(g.geocode("1 Main St Lowell MA 01852").is_none());
        assert!(g.geocode("021").is_none());
    }

    #[test]
    fn point_document_round_trip_keeps_coordinates() {
        let p = StaticGeocoder::new(vec![boston()]).geocode("02118").unwrap();
        let back = GeoPoint::from_document(&p.to_document()).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn boston_to_providence_is_about_forty_miles() {
        let miles = central_angle(-71.0589, 42.3601, -71.4128, 41.8240) * EARTH_RADIUS_MILES;
        assert!((miles - 41.0).abs() < 2.0, "{miles}");
    }
}
