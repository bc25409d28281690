/// Google Maps geocoding + nearby place search, used to find sports venues
/// around an address.
use crate::client::{ApiResult, HttpClient, with_query};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

pub const MAPS_API: &str = "https://maps.googleapis.com/maps/api";
pub const SEARCH_RADIUS_METERS: u32 = 5000;
pub const VENUE_TYPE: &str = "stadium";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GeocodeResult {
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Geometry {
    pub location: Option<LatLng>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct NearbyResponse {
    #[serde(default)]
    pub status: String,
    /// Place objects are passed through untouched.
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Places {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl Places {
    pub fn new(client: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, api_key: api_key.into() }
    }

    /// Coordinates of the first geocoding match, or `None` when the service
    /// does not answer `OK`.
    pub async fn geocode(&self, address: &str) -> ApiResult<Option<LatLng>> {
        let url = with_query(
            &format!("{}/geocode/json", self.base_url),
            &[("address", address), ("key", &self.api_key)],
        )?;
        let raw: GeocodeResponse = self.client.get_json(&url).await?;

        if raw.status != "OK" {
            debug!("geocoding {address:?} answered {}", raw.status);
            return Ok(None);
        }

        Ok(raw
            .results
            .into_iter()
            .next()
            .and_then(|r| r.geometry)
            .and_then(|g| g.location))
    }

    pub async fn nearby_venues(&self, at: LatLng) -> ApiResult<Vec<Value>> {
        let location = format!("{},{}", at.lat, at.lng);
        let radius = SEARCH_RADIUS_METERS.to_string();
        let url = with_query(
            &format!("{}/place/nearbysearch/json", self.base_url),
            &[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", VENUE_TYPE),
                ("key", self.api_key.as_str()),
            ],
        )?;
        let raw: NearbyResponse = self.client.get_json(&url).await?;
        Ok(raw.results)
    }

    /// Venues near `address`; empty when the address does not geocode.
    pub async fn search_local_venues(&self, address: &str) -> ApiResult<Vec<Value>> {
        match self.geocode(address).await? {
            Some(at) => self.nearby_venues(at).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn geocode_then_nearby_search() {
        let mut server = mockito::Server::new_async().await;
        let geocode = server
            .mock("GET", "/geocode/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("address".into(), "Kansas City, MO".into()),
                Matcher::UrlEncoded("key".into(), "mk".into()),
            ]))
            .with_body(
                r#"{"status":"OK","results":[{"geometry":{"location":{"lat":39.05,"lng":-94.48}}}]}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let nearby = server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("location".into(), "39.05,-94.48".into()),
                Matcher::UrlEncoded("radius".into(), "5000".into()),
                Matcher::UrlEncoded("type".into(), "stadium".into()),
            ]))
            .with_body(r#"{"status":"OK","results":[{"name":"Arrowhead Stadium"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let places = Places::new(HttpClient::default(), server.url(), "mk");
        let venues = places.search_local_venues("Kansas City, MO").await.unwrap();
        assert_eq!(venues, vec![json!({"name": "Arrowhead Stadium"})]);
        geocode.assert_async().await;
        nearby.assert_async().await;
    }

    #[tokio::test]
    async fn failed_geocode_skips_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geocode/json")
            .match_query(Matcher::Any)
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create_async()
            .await;
        let nearby = server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let places = Places::new(HttpClient::default(), server.url(), "mk");
        let venues = places.search_local_venues("nowhere").await.unwrap();
        assert!(venues.is_empty());
        nearby.assert_async().await;
    }
}
