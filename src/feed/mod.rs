//! Personalized feed ordering.
//!
//! Ranking asks the recommendation oracle for an ordered id list and sorts
//! recommended listings ahead of the rest, newest first among the rest.
//! Without a viewer, or when the oracle fails, times out or answers with
//! nothing, the feed is simply newest first. Ranking never fails.
//!
//! Partitioning then splits the ranked feed into one row per preferred
//! category (in the viewer's declared order) plus a residual "more for you"
//! list. A listing lands in the first row whose category it carries and in
//! no later one.

mod oracle;

use std::{collections::{HashMap, HashSet}, sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Listing, UserProfile};

pub use oracle::{HttpRecommender, NoRecommender, PersonalizedFeedInput, PersonalizedFeedOutput, Recommend};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub category: String,
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    /// Non-empty preferred-category rows, in the viewer's order.
    pub rows: Vec<CategoryRow>,
    /// Listings that matched no preferred category.
    pub more: Vec<Listing>,
    /// Quick filter for `more`: its tags minus the row headers.
    pub more_categories: Vec<String>,
    /// Quick filter for the whole feed: preferred categories, then every other tag.
    pub categories: Vec<String>,
}

impl Feed {
    pub fn len(&self) -> usize {
        self.rows.iter().map(|r| r.listings.len()).sum::<usize>() + self.more.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct FeedRanker {
    oracle: Arc<dyn Recommend>,
    timeout: Duration,
}

impl FeedRanker {
    pub fn new(oracle: Arc<dyn Recommend>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Orders `listings` for `viewer`.
    pub async fn rank(&self, listings: Vec<Listing>, viewer: Option<&UserProfile>) -> Vec<Listing> {
        let Some(viewer) = viewer else {
            return chronological(listings);
        };

        match self.recommendations(&listings, viewer).await {
            Some(recommended) if !recommended.is_empty() => rank_with(listings, &recommended),
            _ => chronological(listings),
        }
    }

    /// Ranks, then partitions by the viewer's preferred categories.
    pub async fn feed(&self, listings: Vec<Listing>, viewer: Option<&UserProfile>) -> Feed {
        let ranked = self.rank(listings, viewer).await;
        let preferred = viewer.map(|v| v.preferred_categories.as_slice()).unwrap_or_default();
        partition(ranked, preferred)
    }

    async fn recommendations(&self, listings: &[Listing], viewer: &UserProfile) -> Option<Vec<String>> {
        let input = PersonalizedFeedInput {
            user_id: viewer.id.clone(),
            listing_tags: unique_tags(listings),
            user_history: viewer.viewed_tags.clone(),
            current_listings: listings.iter().map(|l| l.id.clone()).collect(),
        };

        match tokio::time::timeout(self.timeout, self.oracle.recommend(input)).await {
            Ok(Ok(output)) => {
                debug!("oracle recommended {} listings for u/{}", output.recommended_listings.len(), viewer.id);
                Some(output.recommended_listings)
            }
            Ok(Err(e)) => {
                warn!("recommendations failed for u/{}, falling back to chronological: {e:#}", viewer.id);
                None
            }
            Err(_) => {
                warn!("recommendations timed out after {:?} for u/{}, falling back to chronological", self.timeout, viewer.id);
                None
            }
        }
    }
}

/// Every distinct tag, in order of first appearance.
pub fn unique_tags(listings: &[Listing]) -> Vec<String> {
    let mut seen = HashSet::new();
    listings
        .iter()
        .flat_map(|l| l.tags.iter())
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

/// Newest first. Equal timestamps keep their input order.
pub fn chronological(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listings
}

/// Recommended listings first, in `recommended` order, then the rest newest
/// first. Ids that match no listing are ignored. Stable.
pub fn rank_with(mut listings: Vec<Listing>, recommended: &[String]) -> Vec<Listing> {
    let mut rank: HashMap<&str, usize> = HashMap::with_capacity(recommended.len());
    for (i, id) in recommended.iter().enumerate() {
        // first mention wins
        rank.entry(id.as_str()).or_insert(i);
    }

    listings.sort_by(|a, b| {
        match (rank.get(a.id.as_str()), rank.get(b.id.as_str())) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        }
    });
    listings
}

/// Splits an already ranked feed into preferred rows and the residual list.
pub fn partition(ranked: Vec<Listing>, preferred: &[String]) -> Feed {
    let mut headers: Vec<&str> = vec![];
    for category in preferred {
        if !category.is_empty() && !headers.contains(&category.as_str()) {
            headers.push(category);
        }
    }

    let mut categories: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for tag in unique_tags(&ranked) {
        if !categories.contains(&tag) {
            categories.push(tag);
        }
    }

    let mut rows: Vec<CategoryRow> = headers
        .iter()
        .map(|h| CategoryRow { category: h.to_string(), listings: vec![] })
        .collect();
    let mut more = vec![];

    for listing in ranked {
        match rows.iter_mut().find(|row| listing.has_tag(&row.category)) {
            Some(row) => row.listings.push(listing),
            None => more.push(listing),
        }
    }

    rows.retain(|row| !row.listings.is_empty());

    let more_categories = unique_tags(&more)
        .into_iter()
        .filter(|tag| !headers.contains(&tag.as_str()))
        .collect();

    Feed { rows, more, more_categories, categories }
}

/// Most recently viewed first.
pub fn trending(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.last_viewed_at.cmp(&a.last_viewed_at));
    listings
}
