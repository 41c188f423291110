use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    /// Tags the user has interacted with. Order carries no meaning.
    pub viewed_tags: Vec<String>,
    /// Declared interests. Order decides the feed's row order.
    pub preferred_categories: Vec<String>,
}

/// The public face of a seller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerCard {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
}

impl From<UserProfile> for SellerCard {
    fn from(user: UserProfile) -> Self {
        SellerCard {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" => Ok(ListingStatus::Sold),
            other => Err(format!("unknown listing status {other:?}").into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub seller_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_viewed_at: OffsetDateTime,
    pub status: ListingStatus,
}

impl Listing {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub listing_id: String,
    /// Always the sorted pair.
    pub participant_ids: [String; 2],
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewListing {
    /// Checks field bounds and normalises tags in place.
    pub fn validate(&mut self) -> AppResult<()> {
        self.title = self.title.trim().to_owned();
        let title_len = self.title.chars().count();
        if !(5..=100).contains(&title_len) {
            return Err(AppError::bad_request("title must be 5 to 100 characters"));
        }

        let description_len = self.description.trim().chars().count();
        if !(20..=1000).contains(&description_len) {
            return Err(AppError::bad_request("description must be 20 to 1000 characters"));
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::bad_request("price cannot be negative"));
        }

        self.tags = normalize_tags(&self.tags);
        if self.tags.is_empty() {
            return Err(AppError::bad_request("add at least one tag"));
        }

        Ok(())
    }
}

/// Lower-cases, trims and deduplicates, keeping first appearance order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub(crate) fn to_nanos(t: OffsetDateTime) -> i64 {
    t.unix_timestamp_nanos() as i64
}

pub(crate) fn from_nanos(nanos: i64) -> AppResult<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)?)
}
