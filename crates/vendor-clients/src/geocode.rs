//! ArcGIS World Geocoding (`findAddressCandidates`)

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use site_power::ports::Geocoder;
use site_power::{Coordinates, GeocodeError};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ClientError;
use crate::http::{HttpSettings, RestClient};

fn default_url() -> String {
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates"
        .to_string()
}

fn default_min_score() -> f64 {
    90.0
}

/// Geocoder settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Lowest acceptable candidate score when several candidates come back
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Extra query parameters (e.g. `token`, `countryCode`)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct CandidateList {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    address: String,
    location: Point,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

/// Pick the best candidate.
///
/// A lone candidate is accepted as is; among several, the first (best
/// ranked) must reach `min_score`.
fn pick(address: &str, candidates: &[Candidate], min_score: f64) -> Result<Coordinates, GeocodeError> {
    let best = match candidates {
        [] => return Err(GeocodeError::NoCandidate(address.to_string())),
        [only] => only,
        [best, ..] if best.score >= min_score => best,
        [best, ..] => {
            return Err(GeocodeError::LowScore {
                score: best.score,
                min_score,
            })
        }
    };

    debug!("Address found: {} | Score: {}", best.address, best.score);
    Ok(Coordinates {
        longitude: best.location.x,
        latitude: best.location.y,
    })
}

/// ArcGIS geocoding client
pub struct ArcGisGeocoder {
    client: RestClient,
    url: String,
    min_score: f64,
    params: BTreeMap<String, String>,
}

impl ArcGisGeocoder {
    pub fn new(config: &GeocodeConfig) -> Result<Self, ClientError> {
        let mut params = BTreeMap::from([("f".to_string(), "json".to_string())]);
        params.extend(config.params.clone());

        Ok(Self {
            client: RestClient::new("geocode", &config.http, HeaderMap::new())?,
            url: config.url.clone(),
            min_score: config.min_score,
            params,
        })
    }
}

#[async_trait]
impl Geocoder for ArcGisGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let mut params = self.params.clone();
        params.insert("SingleLine".to_string(), address.to_string());

        let request = self.client.get(&self.url).query(&params);
        let list: CandidateList = self.client.json(request).await?;
        pick(address, &list.candidates, self.min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(scores: &[f64]) -> Vec<Candidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| Candidate {
                address: format!("candidate {}", i),
                location: Point {
                    x: -119.0 - i as f64,
                    y: 36.0,
                },
                score: *score,
            })
            .collect()
    }

    #[test]
    fn test_no_candidate() {
        let err = pick("nowhere", &[], 90.0).unwrap_err();
        assert!(matches!(err, GeocodeError::NoCandidate(ref a) if a == "nowhere"));
    }

    #[test]
    fn test_single_candidate_is_accepted_regardless_of_score() {
        let point = pick("a", &candidates(&[42.0]), 90.0).unwrap();
        assert_eq!(point.longitude, -119.0);
    }

    #[test]
    fn test_best_of_several_must_reach_min_score() {
        let point = pick("a", &candidates(&[95.0, 80.0]), 90.0).unwrap();
        assert_eq!(point.longitude, -119.0);

        let err = pick("a", &candidates(&[85.0, 80.0]), 90.0).unwrap_err();
        assert!(matches!(err, GeocodeError::LowScore { score, .. } if score == 85.0));
    }

    #[test]
    fn test_response_parsing() {
        let list: CandidateList = serde_json::from_str(
            r#"{"spatialReference": {"wkid": 4326}, "candidates": [
                {"address": "100 Main St, Fresno, California, 93721", "location": {"x": -119.78, "y": 36.74}, "score": 100, "attributes": {}}
            ]}"#,
        )
        .unwrap();
        let point = pick("100 Main St", &list.candidates, 90.0).unwrap();
        assert_eq!(point.latitude, 36.74);
    }
}
