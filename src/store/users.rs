use rand::seq::IndexedRandom;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{models::{normalize_tags, NewUser, UserProfile}, AppError, AppResult};

use super::Store;

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    avatar_url: String,
    viewed_tags: String,
    preferred_categories: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(UserProfile {
            id: row.id,
            name: row.name,
            email: row.email,
            avatar_url: row.avatar_url,
            viewed_tags: serde_json::from_str(&row.viewed_tags)?,
            preferred_categories: serde_json::from_str(&row.preferred_categories)?,
        })
    }
}

fn placeholder_avatar() -> String {
    let seeds = [
        "badger", "lake", "terrace", "capitol", "bascom", "camp", "union", "library",
        "statest", "picnic", "mendota", "monona", "arboretum", "chair", "kiosk",
    ];
    let seed = seeds.choose(&mut rand::rng()).copied().unwrap_or("badger");
    format!("https://picsum.photos/seed/{seed}/200/200")
}

async fn fetch_user(pool: &SqlitePool, id: &str) -> AppResult<UserProfile> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id,name,email,avatar_url,viewed_tags,preferred_categories FROM users WHERE id=?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("user"))?
    .try_into()
}

async fn fetch_users(pool: &SqlitePool) -> AppResult<Vec<UserProfile>> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id,name,email,avatar_url,viewed_tags,preferred_categories FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(UserProfile::try_from)
    .collect()
}

impl Store {
    pub async fn create_user(&self, new: NewUser) -> AppResult<UserProfile> {
        let name = new.name.trim().to_owned();
        let email = new.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::bad_request("name is required"));
        }
        if !email.contains('@') {
            return Err(AppError::bad_request("a valid email is required"));
        }

        let user = UserProfile {
            id: Uuid::now_v7().to_string(),
            name,
            email,
            avatar_url: new.avatar_url.unwrap_or_else(placeholder_avatar),
            viewed_tags: vec![],
            preferred_categories: normalize_tags(&new.preferred_categories),
        };

        sqlx::query(
            "INSERT INTO users (id,name,email,avatar_url,viewed_tags,preferred_categories) VALUES (?,?,?,?,?,?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(serde_json::to_string(&user.viewed_tags)?)
        .bind(serde_json::to_string(&user.preferred_categories)?)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("{} is already registered", user.email)),
            e => e,
        })?;

        info!("adding u/{} <{}>", user.id, user.email);
        Ok(user)
    }

    pub async fn user(&self, id: &str) -> AppResult<UserProfile> {
        self.retry.run("load user", || fetch_user(&self.pool, id)).await
    }

    pub async fn user_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let email = email.trim().to_lowercase();
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id,name,email,avatar_url,viewed_tags,preferred_categories FROM users WHERE email=?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    pub async fn users(&self) -> AppResult<Vec<UserProfile>> {
        self.retry.run("load users", || fetch_users(&self.pool)).await
    }
}

/// Unions `tags` into the user's viewing history. Returns false when the user is gone.
pub(super) async fn add_viewed_tags(conn: &mut SqliteConnection, user_id: &str, tags: &[String]) -> AppResult<bool> {
    let Some((viewed,)): Option<(String,)> = sqlx::query_as("SELECT viewed_tags FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(false);
    };

    let mut viewed: Vec<String> = serde_json::from_str(&viewed)?;
    let before = viewed.len();
    for tag in tags {
        if !viewed.contains(tag) {
            viewed.push(tag.clone());
        }
    }

    if viewed.len() != before {
        sqlx::query("UPDATE users SET viewed_tags=? WHERE id=?")
            .bind(serde_json::to_string(&viewed)?)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(true)
}
