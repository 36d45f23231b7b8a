use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Centre of Paris, used to bias address results.
    pub const PARIS: GeoPoint = GeoPoint {
        latitude: 48.866667,
        longitude: 2.333333,
    };
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::PARIS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressQuery {
    pub text: String,
    pub bias: GeoPoint,
    pub limit: usize,
}

impl AddressQuery {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bias: GeoPoint::default(),
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_bias(
        mut self,
        bias: GeoPoint,
    ) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit;
        self
    }
}

/// One candidate returned by the geocoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSuggestion {
    pub place_id: String,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub housenumber: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl AddressSuggestion {
    /// Identifier built from the house number and coordinates, which is what
    /// distinguishes two candidates sharing a label.
    pub fn make_place_id(
        housenumber: Option<&str>,
        latitude: f64,
        longitude: f64,
    ) -> String {
        format!("{}{}{}", housenumber.unwrap_or(""), latitude, longitude)
    }
}
