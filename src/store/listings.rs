use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    live::Topic,
    models::{from_nanos, to_nanos, Listing, ListingStatus, NewListing},
    AppError, AppResult,
};

use super::{users::add_viewed_tags, Store};

#[derive(FromRow)]
struct ListingRow {
    id: String,
    title: String,
    description: String,
    price: f64,
    tags: String,
    images: String,
    seller_id: String,
    created_at: i64,
    views: i64,
    last_viewed_at: i64,
    status: String,
}

impl TryFrom<ListingRow> for Listing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> AppResult<Self> {
        Ok(Listing {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            tags: serde_json::from_str(&row.tags)?,
            images: serde_json::from_str(&row.images)?,
            seller_id: row.seller_id,
            created_at: from_nanos(row.created_at)?,
            views: row.views,
            last_viewed_at: from_nanos(row.last_viewed_at)?,
            status: ListingStatus::parse(&row.status)?,
        })
    }
}

const LISTING_COLUMNS: &str =
    "id,title,description,price,tags,images,seller_id,created_at,views,last_viewed_at,status";

#[derive(Clone, Copy)]
enum Scope<'a> {
    All,
    Active,
    Seller(&'a str),
}

async fn fetch_listing(pool: &SqlitePool, id: &str) -> AppResult<Option<Listing>> {
    sqlx::query_as::<_, ListingRow>(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id=?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Listing::try_from)
        .transpose()
}

async fn fetch_listings(pool: &SqlitePool, scope: Scope<'_>) -> AppResult<Vec<Listing>> {
    let rows = match scope {
        Scope::All => {
            sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC, rowid"
            ))
            .fetch_all(pool)
            .await?
        }
        Scope::Active => {
            sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE status='active' ORDER BY created_at DESC, rowid"
            ))
            .fetch_all(pool)
            .await?
        }
        Scope::Seller(seller_id) => {
            sqlx::query_as::<_, ListingRow>(&format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE seller_id=? ORDER BY created_at DESC, rowid"
            ))
            .bind(seller_id)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(Listing::try_from).collect()
}

impl Store {
    pub async fn create_listing(&self, seller_id: &str, mut new: NewListing) -> AppResult<Listing> {
        new.validate()?;
        // the seller must exist
        self.user(seller_id).await?;

        let now = OffsetDateTime::now_utc();
        let listing = Listing {
            id: Uuid::now_v7().to_string(),
            title: new.title,
            description: new.description.trim().to_owned(),
            price: new.price,
            tags: new.tags,
            images: new.images,
            seller_id: seller_id.to_owned(),
            created_at: now,
            views: 0,
            last_viewed_at: now,
            status: ListingStatus::Active,
        };

        sqlx::query(
            "INSERT INTO listings (id,title,description,price,tags,images,seller_id,created_at,views,last_viewed_at,status) VALUES (?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(&listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(serde_json::to_string(&listing.tags)?)
        .bind(serde_json::to_string(&listing.images)?)
        .bind(&listing.seller_id)
        .bind(to_nanos(listing.created_at))
        .bind(listing.views)
        .bind(to_nanos(listing.last_viewed_at))
        .bind(listing.status.as_str())
        .execute(&self.pool)
        .await?;

        info!("u/{seller_id} listed l/{} {:?}", listing.id, listing.title);
        self.hub.publish(Topic::Listings);
        Ok(listing)
    }

    pub async fn listing(&self, id: &str) -> AppResult<Listing> {
        self.find_listing(id).await?.ok_or(AppError::NotFound("listing"))
    }

    pub async fn find_listing(&self, id: &str) -> AppResult<Option<Listing>> {
        self.retry.run("load listing", || fetch_listing(&self.pool, id)).await
    }

    /// Every listing, newest first.
    pub async fn listings(&self) -> AppResult<Vec<Listing>> {
        self.retry.run("load listings", || fetch_listings(&self.pool, Scope::All)).await
    }

    /// Listings still for sale, newest first.
    pub async fn active_listings(&self) -> AppResult<Vec<Listing>> {
        self.retry
            .run("load active listings", || fetch_listings(&self.pool, Scope::Active))
            .await
    }

    pub async fn listings_by_seller(&self, seller_id: &str) -> AppResult<Vec<Listing>> {
        self.retry
            .run("load seller listings", || fetch_listings(&self.pool, Scope::Seller(seller_id)))
            .await
    }

    async fn owned_listing(&self, actor: &str, id: &str) -> AppResult<Listing> {
        let listing = self.listing(id).await?;
        if listing.seller_id != actor {
            return Err(AppError::PermissionDenied("only the seller can change this listing"));
        }
        Ok(listing)
    }

    /// Active to sold. Marking a sold listing again changes nothing.
    pub async fn mark_sold(&self, actor: &str, id: &str) -> AppResult<Listing> {
        let mut listing = self.owned_listing(actor, id).await?;
        if listing.status == ListingStatus::Sold {
            return Ok(listing);
        }

        let pool = &self.pool;
        self.retry
            .run("mark listing sold", move || async move {
                sqlx::query("UPDATE listings SET status='sold' WHERE id=? AND seller_id=?")
                    .bind(id)
                    .bind(actor)
                    .execute(pool)
                    .await
                    .map_err(AppError::from)
            })
            .await?;

        info!("l/{id} marked sold");
        listing.status = ListingStatus::Sold;
        self.hub.publish(Topic::Listings);
        Ok(listing)
    }

    pub async fn delete_listing(&self, actor: &str, id: &str) -> AppResult<()> {
        self.owned_listing(actor, id).await?;

        sqlx::query("DELETE FROM listings WHERE id=? AND seller_id=?")
            .bind(id)
            .bind(actor)
            .execute(&self.pool)
            .await?;

        info!("l/{id} deleted");
        self.hub.publish(Topic::Listings);
        // inbox entries for this listing disappear with it
        for participant in self.participants_for_listing(id).await? {
            self.hub.publish(Topic::Inbox(participant));
        }
        Ok(())
    }

    /// Counts a view. A viewer other than the seller also picks up the
    /// listing's tags into their history, in the same transaction. A viewer
    /// whose profile is gone is counted as anonymous.
    pub async fn record_view(&self, viewer: Option<&str>, id: &str) -> AppResult<Listing> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE listings SET views=views+1, last_viewed_at=? WHERE id=?")
            .bind(to_nanos(OffsetDateTime::now_utc()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("listing"));
        }

        let listing: Listing =
            sqlx::query_as::<_, ListingRow>(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id=?"))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
                .try_into()?;

        if let Some(viewer) = viewer.filter(|v| *v != listing.seller_id) {
            if !add_viewed_tags(&mut *tx, viewer, &listing.tags).await? {
                warn!("u/{viewer} viewed l/{id} but has no profile");
            }
        }

        tx.commit().await?;
        Ok(listing)
    }
}
