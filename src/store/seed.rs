use serde::Deserialize;
use tracing::info;

use crate::{include_res, models::{NewListing, NewUser}, AppError, AppResult};

use super::Store;

#[derive(Debug, Deserialize)]
pub struct SeedData {
    pub users: Vec<NewUser>,
    pub listings: Vec<SeedListing>,
}

#[derive(Debug, Deserialize)]
pub struct SeedListing {
    pub seller_email: String,
    #[serde(flatten)]
    pub listing: NewListing,
}

pub fn demo_seed() -> AppResult<SeedData> {
    Ok(serde_json::from_str(include_res!(str, "/seed.json"))?)
}

impl Store {
    /// Loads `data` into an empty store. A store that already has users is left alone.
    pub async fn seed(&self, data: SeedData) -> AppResult<()> {
        if !self.users().await?.is_empty() {
            info!("store already has users, skipping seed");
            return Ok(());
        }

        for user in data.users {
            self.create_user(user).await?;
        }

        for SeedListing { seller_email, listing } in data.listings {
            let Some(seller) = self.user_by_email(&seller_email).await? else {
                return Err(AppError::bad_request(format!("seed listing refers to unknown seller {seller_email}")));
            };
            self.create_listing(&seller.id, listing).await?;
        }

        info!("seeded demo data");
        Ok(())
    }
}
