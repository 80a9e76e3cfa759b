use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use breakbread_core::{Coordinates, PlaceData, PlacesError, PlacesGateway};

const API_BASE: &str = "https://maps.googleapis.com/maps/api/place";

/// The width requested for place photos
const PHOTO_WIDTH: &str = "400";

/// A places gateway backed by the Google Places web service
pub struct GooglePlaces {
    http: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    /// Present on proximity results
    vicinity: Option<String>,
    /// Present on text results
    formatted_address: Option<String>,
    rating: Option<f32>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
    #[serde(default)]
    photos: Vec<PhotoRef>,
    opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
struct PhotoRef {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

impl GooglePlaces {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    fn photo_url(&self, reference: &str) -> String {
        Url::parse_with_params(
            &format!("{}/photo", API_BASE),
            &[
                ("maxwidth", PHOTO_WIDTH),
                ("photoreference", reference),
                ("key", &self.api_key),
            ],
        )
        .expect("photo url is valid")
        .into()
    }

    fn into_place(&self, result: PlaceResult) -> PlaceData {
        let photo_url = result
            .photos
            .first()
            .map(|photo| self.photo_url(&photo.photo_reference));

        PlaceData {
            provider_id: result.place_id,
            name: result.name,
            address: result.vicinity.or(result.formatted_address),
            rating: result.rating,
            ratings_total: result.user_ratings_total,
            price_level: result.price_level,
            photo_url,
            open_now: result.opening_hours.and_then(|hours| hours.open_now),
        }
    }

    fn extract_results(&self, response: SearchResponse) -> Result<Vec<PlaceData>, PlacesError> {
        match response.status.as_str() {
            "OK" => Ok(response
                .results
                .into_iter()
                .map(|result| self.into_place(result))
                .collect()),
            "ZERO_RESULTS" => Ok(Vec::new()),
            status => Err(PlacesError::Rejected(
                response.error_message.unwrap_or_else(|| status.to_string()),
            )),
        }
    }

    async fn search(&self, url: String) -> Result<Vec<PlaceData>, PlacesError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PlacesError::FetchError(e.to_string()))?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PlacesError::ParseError(e.to_string()))?;

        self.extract_results(body)
    }
}

#[async_trait]
impl PlacesGateway for GooglePlaces {
    async fn search_nearby(
        &self,
        coordinates: Coordinates,
        radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError> {
        let url = Url::parse_with_params(
            &format!("{}/nearbysearch/json", API_BASE),
            &[
                (
                    "location",
                    format!("{},{}", coordinates.latitude, coordinates.longitude),
                ),
                ("radius", radius_in_meters.to_string()),
                ("type", "restaurant".to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .expect("nearby search url is valid");

        self.search(url.into()).await
    }

    async fn search_text(
        &self,
        query: &str,
        coordinates: Coordinates,
        radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError> {
        let url = Url::parse_with_params(
            &format!("{}/textsearch/json", API_BASE),
            &[
                ("query", query.to_string()),
                (
                    "location",
                    format!("{},{}", coordinates.latitude, coordinates.longitude),
                ),
                ("radius", radius_in_meters.to_string()),
                ("type", "restaurant".to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .expect("text search url is valid");

        self.search(url.into()).await
    }
}
