use async_trait::async_trait;
use devis_core::{AddressGeocoder, AddressQuery, AddressSuggestion, StoreError};
use serde::Deserialize;

use crate::response::{from_reqwest, parse_response};

pub const DEFAULT_GEOCODER_URL: &str = "https://api-adresse.data.gouv.fr/search/";

/// Client for the French national address search (BAN).
#[derive(Debug, Clone)]
pub struct AdresseGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl AdresseGeocoder {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: &str,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

impl Default for AdresseGeocoder {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODER_URL)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// GeoJSON order: longitude, latitude.
    coordinates: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct Properties {
    label: String,
    housenumber: Option<String>,
    street: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
}

impl From<Feature> for AddressSuggestion {
    fn from(feature: Feature) -> Self {
        let [longitude, latitude] = feature.geometry.coordinates;
        let props = feature.properties;
        AddressSuggestion {
            place_id: AddressSuggestion::make_place_id(
                props.housenumber.as_deref(),
                latitude,
                longitude,
            ),
            label: props.label,
            latitude,
            longitude,
            housenumber: props.housenumber,
            street: props.street,
            city: props.city,
            postcode: props.postcode,
        }
    }
}

#[async_trait]
impl AddressGeocoder for AdresseGeocoder {
    async fn search(
        &self,
        query: &AddressQuery,
    ) -> Result<Vec<AddressSuggestion>, StoreError> {
        tracing::debug!(q = %query.text, limit = query.limit, "searching addresses");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query.text.clone()),
                ("lat", query.bias.latitude.to_string()),
                ("lon", query.bias.longitude.to_string()),
                ("limit", query.limit.to_string()),
            ])
            .send()
            .await
            .map_err(from_reqwest)?;
        let collection: FeatureCollection = parse_response(response).await?;
        Ok(collection.features.into_iter().map(AddressSuggestion::from).collect())
    }
}
