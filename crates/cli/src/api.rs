//! HTTP client for the feeder game server.

use anyhow::Result;
use reqwest::{Client, Response};
use shared::api::{
    AutoFeederInfo, BuildAutoFeederPayload, BuildAutoFeederResponse, FeedPayload, FeedResponse,
    PlayerResponse, ScoreBoardResponse,
};

pub struct Api {
    pub http: Client,
    pub base_url: String,
}

impl Api {
    pub fn new(base_url: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Registers one manual click for `user` and returns the new score.
    pub async fn feed(&self, user: &str) -> Result<FeedResponse> {
        let response = Self::check_response(
            self.http
                .post(format!("{}/register-hit", self.base_url))
                .json(&FeedPayload {
                    user: user.to_string(),
                })
                .send()
                .await?,
        )
        .await?;

        Ok(response.json().await?)
    }

    /// Tries to buy one auto-feeder of the given type.
    pub async fn build_auto_feeder(
        &self,
        user: &str,
        feeder_type: u32,
    ) -> Result<BuildAutoFeederResponse> {
        let response = Self::check_response(
            self.http
                .post(format!("{}/build-auto-feeder", self.base_url))
                .json(&BuildAutoFeederPayload {
                    user: user.to_string(),
                    feeder_type,
                })
                .send()
                .await?,
        )
        .await?;

        Ok(response.json().await?)
    }

    /// Fetches the leaderboard, best first.
    pub async fn top_scorers(&self) -> Result<ScoreBoardResponse> {
        let response = Self::check_response(
            self.http
                .get(format!("{}/top-scorers", self.base_url))
                .send()
                .await?,
        )
        .await?;

        Ok(response.json().await?)
    }

    /// Lists the auto-feeders for sale.
    pub async fn catalog(&self) -> Result<Vec<AutoFeederInfo>> {
        let response = Self::check_response(
            self.http
                .get(format!("{}/auto-feeders", self.base_url))
                .send()
                .await?,
        )
        .await?;

        Ok(response.json().await?)
    }

    /// Fetches one player's score and holdings.
    pub async fn player(&self, name: &str) -> Result<PlayerResponse> {
        // Names are free text, so push them as an escaped path segment
        let mut url = reqwest::Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid API URL: {}", self.base_url))?
            .pop_if_empty()
            .push("players")
            .push(name);

        let response = Self::check_response(self.http.get(url).send().await?).await?;

        Ok(response.json().await?)
    }

    async fn check_response(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Try to extract error message from JSON response
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|json| {
                    json.get("error")
                        .or_else(|| json.get("message"))
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                })
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("Request failed")
                            .to_string()
                    } else {
                        body
                    }
                });

            anyhow::bail!("{}", message);
        }

        Ok(response)
    }
}
