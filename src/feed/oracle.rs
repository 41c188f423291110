use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedFeedInput {
    pub user_id: String,
    /// Every distinct tag across the candidate listings.
    pub listing_tags: Vec<String>,
    /// Tags the user has looked at before.
    pub user_history: Vec<String>,
    /// Candidate listing ids.
    pub current_listings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedFeedOutput {
    pub recommended_listings: Vec<String>,
}

/// The recommendation oracle. Best effort: callers must survive any error.
pub trait Recommend: Send + Sync {
    fn recommend(&self, input: PersonalizedFeedInput) -> BoxFuture<'_, anyhow::Result<PersonalizedFeedOutput>>;
}

/// Used when no recommender is configured.
pub struct NoRecommender;

impl Recommend for NoRecommender {
    fn recommend(&self, _input: PersonalizedFeedInput) -> BoxFuture<'_, anyhow::Result<PersonalizedFeedOutput>> {
        Box::pin(async { Err(anyhow::anyhow!("no recommender configured")) })
    }
}

/// Posts the input as JSON to an HTTP endpoint that answers with
/// `{ "recommendedListings": [...] }`.
pub struct HttpRecommender {
    client: reqwest::Client,
    url: String,
}

impl HttpRecommender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Recommend for HttpRecommender {
    fn recommend(&self, input: PersonalizedFeedInput) -> BoxFuture<'_, anyhow::Result<PersonalizedFeedOutput>> {
        Box::pin(async move {
            debug!(
                "asking {} about {} listings for u/{}",
                self.url,
                input.current_listings.len(),
                input.user_id
            );
            let output = self
                .client
                .post(&self.url)
                .json(&input)
                .send()
                .await?
                .error_for_status()?
                .json::<PersonalizedFeedOutput>()
                .await?;
            Ok(output)
        })
    }
}
