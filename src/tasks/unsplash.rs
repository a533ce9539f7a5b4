//! Random photos from the Unsplash API.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Orientation, UnsplashOptions};
use crate::error::AcquireError;
use crate::events::Attribution;

const DEFAULT_PHOTOGRAPHER: &str = "Unsplash photographer";
const DEFAULT_CREDIT_URL: &str = "https://unsplash.com";

/// Where to download a random photo from and whom to credit for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPhoto {
    pub image_url: String,
    pub attribution: Attribution,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhotoResponse {
    urls: PhotoUrls,
    user: PhotoUser,
    links: PhotoLinks,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhotoUrls {
    regular: Option<String>,
    full: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhotoUser {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhotoLinks {
    html: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a `/photos/random` response body.
///
/// Prefers `urls.regular` over `urls.full`; the credit falls back to a generic
/// photographer name and the Unsplash home page when the response omits them.
pub fn parse_random_photo(body: &str) -> Result<RandomPhoto, AcquireError> {
    let response: PhotoResponse = serde_json::from_str(body)?;
    let image_url = non_empty(response.urls.regular)
        .or_else(|| non_empty(response.urls.full))
        .ok_or(AcquireError::NoImageUrl)?;
    let text = non_empty(response.user.name).unwrap_or_else(|| DEFAULT_PHOTOGRAPHER.to_string());
    let url = non_empty(response.links.html).unwrap_or_else(|| DEFAULT_CREDIT_URL.to_string());
    Ok(RandomPhoto {
        image_url,
        attribution: Attribution { text, url },
    })
}

/// Draws a topic at random from the configured query list.
#[derive(Debug)]
pub struct TopicPicker {
    queries: Vec<String>,
    rng: StdRng,
}

impl TopicPicker {
    pub fn new(queries: &[String]) -> Self {
        Self::with_rng(queries, StdRng::from_os_rng())
    }

    pub fn with_rng(queries: &[String], rng: StdRng) -> Self {
        let queries = queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();
        Self { queries, rng }
    }

    pub fn pick(&mut self) -> Option<String> {
        self.queries.iter().choose(&mut self.rng).cloned()
    }
}

#[derive(Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    endpoint: String,
    access_key: Option<String>,
    access_key_env: String,
    orientation: Orientation,
}

impl UnsplashClient {
    pub fn new(options: &UnsplashOptions) -> Result<Self, AcquireError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            access_key: options.resolve_access_key(),
            access_key_env: options.access_key_env.clone(),
            orientation: options.orientation,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.access_key.is_some()
    }

    /// Ask the API for a random photo matching `topic`.
    pub async fn random_photo(&self, topic: &str) -> Result<RandomPhoto, AcquireError> {
        let key = self
            .access_key
            .as_deref()
            .ok_or_else(|| AcquireError::MissingCredentials {
                env: self.access_key_env.clone(),
            })?;
        let url = format!("{}/photos/random", self.endpoint);
        debug!(topic, orientation = %self.orientation, "requesting random photo");
        let response = self
            .http
            .get(&url)
            .query(&[("orientation", self.orientation.as_str()), ("query", topic)])
            .header(reqwest::header::AUTHORIZATION, format!("Client-ID {key}"))
            .header("Accept-Version", "v1")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body.trim().to_string()
            };
            return Err(AcquireError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_random_photo(&body)
    }

    /// Fetch the raw image bytes behind `url`.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, AcquireError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Remote {
                status: status.as_u16(),
                message: format!("image download failed for {url}"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
