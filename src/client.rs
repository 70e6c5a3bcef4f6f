//! Remote profile lookup.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::Settings;
use crate::error::{Error, Result};

/// The two fields the views show. Other fields in the response are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub login: String,
    pub avatar_url: String,
}

/// Where profiles come from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Profile>;
}

/// `GET {api_base}/users/{name}` over reqwest.
pub struct GithubClient {
    client: Client,
    api_base: Url,
}

impl GithubClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: settings.api_base_url()?,
        })
    }

    /// Endpoint for one user, with `name` escaped as a path segment.
    pub fn user_url(&self, name: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .push("users")
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl ProfileSource for GithubClient {
    #[instrument(skip(self))]
    async fn fetch(&self, name: &str) -> Result<Profile> {
        let url = self.user_url(name)?;
        debug!(%url, "Fetching profile");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                name: name.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        let profile: Profile = serde_json::from_slice(&body)?;
        debug!(login = %profile.login, "Profile received");
        Ok(profile)
    }
}
