use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    live::{Subscription, Topic},
    models::{from_nanos, to_nanos, Conversation, Listing, Message, UserProfile},
    AppError, AppResult,
};

use super::Store;

const CONVERSATION_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_0b2e_4d5a_4f8e_9b7c_35a1_e2d4_c081);
const MAX_MESSAGE_CHARS: usize = 2000;

/// The two ids in a fixed order, so either side resolves to the same thread.
pub fn canonical_pair(a: &str, b: &str) -> [String; 2] {
    if a <= b {
        [a.to_owned(), b.to_owned()]
    } else {
        [b.to_owned(), a.to_owned()]
    }
}

/// Primary key of the conversation about `listing_id` between `pair`.
/// Concurrent first contacts derive the same key and collide on insert.
pub fn conversation_key(listing_id: &str, pair: &[String; 2]) -> Uuid {
    let name = format!("{listing_id}\n{}\n{}", pair[0], pair[1]);
    Uuid::new_v5(&CONVERSATION_NAMESPACE, name.as_bytes())
}

#[derive(FromRow)]
struct ConversationRow {
    id: String,
    listing_id: String,
    participant_a: String,
    participant_b: String,
    last_message_at: i64,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = AppError;

    fn try_from(row: ConversationRow) -> AppResult<Self> {
        Ok(Conversation {
            id: row.id,
            listing_id: row.listing_id,
            participant_ids: [row.participant_a, row.participant_b],
            last_message_at: from_nanos(row.last_message_at)?,
        })
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    text: String,
    sender_id: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Self> {
        Ok(Message {
            id: row.id,
            text: row.text,
            sender_id: row.sender_id,
            created_at: from_nanos(row.created_at)?,
        })
    }
}

/// One line of a user's inbox.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub conversation: Conversation,
    pub listing: Listing,
    pub other_participant: UserProfile,
    pub last_message: Option<Message>,
}

async fn fetch_conversation(pool: &SqlitePool, id: &str) -> AppResult<Option<Conversation>> {
    sqlx::query_as::<_, ConversationRow>(
        "SELECT id,listing_id,participant_a,participant_b,last_message_at FROM conversations WHERE id=?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Conversation::try_from)
    .transpose()
}

async fn insert_if_absent(pool: &SqlitePool, id: &str, listing_id: &str, pair: &[String; 2]) -> AppResult<bool> {
    let inserted = sqlx::query(
        "INSERT INTO conversations (id,listing_id,participant_a,participant_b,last_message_at) VALUES (?,?,?,?,?) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(listing_id)
    .bind(&pair[0])
    .bind(&pair[1])
    .bind(to_nanos(OffsetDateTime::now_utc()))
    .execute(pool)
    .await?;

    Ok(inserted.rows_affected() == 1)
}

async fn fetch_inbox(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Conversation>> {
    sqlx::query_as::<_, ConversationRow>(
        "SELECT c.id,c.listing_id,c.participant_a,c.participant_b,c.last_message_at,
            COALESCE((SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id=c.id), c.last_message_at) AS activity
        FROM conversations c
        WHERE c.participant_a=? OR c.participant_b=?
        ORDER BY activity DESC, c.id",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Conversation::try_from)
    .collect()
}

async fn fetch_messages(pool: &SqlitePool, conversation_id: &str) -> AppResult<Vec<Message>> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT id,text,sender_id,created_at FROM messages WHERE conversation_id=? ORDER BY created_at, rowid",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Message::try_from)
    .collect()
}

async fn fetch_last_message(pool: &SqlitePool, conversation_id: &str) -> AppResult<Option<Message>> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT id,text,sender_id,created_at FROM messages WHERE conversation_id=? ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?
    .map(Message::try_from)
    .transpose()
}

impl Store {
    /// Get-or-create the thread about `listing_id` between `a` and `b`.
    ///
    /// Argument order does not matter. An existing thread comes back
    /// untouched. The insert is keyed by [`conversation_key`] and ignores
    /// conflicts, so racing callers all end up reading the same row.
    pub async fn resolve_conversation(&self, listing_id: &str, a: &str, b: &str) -> AppResult<Conversation> {
        if a == b {
            return Err(AppError::bad_request("cannot open a conversation with yourself"));
        }

        let pair = canonical_pair(a, b);
        let id = conversation_key(listing_id, &pair).to_string();

        let created = self
            .retry
            .run("open conversation", || insert_if_absent(&self.pool, &id, listing_id, &pair))
            .await?;

        if created {
            info!("opened c/{id} on l/{listing_id} for u/{} and u/{}", pair[0], pair[1]);
            for participant in &pair {
                self.hub.publish(Topic::Inbox(participant.clone()));
            }
        }

        self.retry
            .run("load conversation", || fetch_conversation(&self.pool, &id))
            .await?
            .ok_or(AppError::NotFound("conversation"))
    }

    /// The conversation, if `actor` takes part in it.
    pub async fn conversation(&self, actor: &str, id: &str) -> AppResult<Conversation> {
        let conversation = self
            .retry
            .run("load conversation", || fetch_conversation(&self.pool, id))
            .await?
            .ok_or(AppError::NotFound("conversation"))?;

        if !conversation.has_participant(actor) {
            return Err(AppError::PermissionDenied("not a participant in this conversation"));
        }
        Ok(conversation)
    }

    /// Most recently active first.
    pub async fn conversations_for(&self, user_id: &str) -> AppResult<Vec<Conversation>> {
        self.retry.run("load inbox", || fetch_inbox(&self.pool, user_id)).await
    }

    /// Oldest first.
    pub async fn messages(&self, actor: &str, conversation_id: &str) -> AppResult<Vec<Message>> {
        self.conversation(actor, conversation_id).await?;
        self.retry
            .run("load messages", || fetch_messages(&self.pool, conversation_id))
            .await
    }

    /// Appends a message and bumps the thread's `last_message_at` in one transaction.
    pub async fn send_message(&self, actor: &str, conversation_id: &str, text: &str) -> AppResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::bad_request("message is empty"));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::bad_request("message is too long"));
        }

        let conversation = self.conversation(actor, conversation_id).await?;

        let message = Message {
            id: Uuid::now_v7().to_string(),
            text: text.to_owned(),
            sender_id: actor.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        let sent_at = to_nanos(message.created_at);

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO messages (id,conversation_id,text,sender_id,created_at) VALUES (?,?,?,?,?)")
            .bind(&message.id)
            .bind(conversation_id)
            .bind(&message.text)
            .bind(&message.sender_id)
            .bind(sent_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE conversations SET last_message_at=? WHERE id=?")
            .bind(sent_at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.hub.publish(Topic::Conversation(conversation_id.to_owned()));
        for participant in conversation.participant_ids {
            self.hub.publish(Topic::Inbox(participant));
        }
        Ok(message)
    }

    pub async fn delete_conversation(&self, actor: &str, id: &str) -> AppResult<()> {
        let conversation = self.conversation(actor, id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM messages WHERE conversation_id=?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM conversations WHERE id=?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("c/{id} deleted by u/{actor}");
        self.hub.publish(Topic::Conversation(id.to_owned()));
        for participant in conversation.participant_ids {
            self.hub.publish(Topic::Inbox(participant));
        }
        Ok(())
    }

    /// The inbox with listing and counterpart filled in. Threads whose
    /// listing or counterpart is gone are left out.
    pub async fn inbox(&self, user_id: &str) -> AppResult<Vec<InboxEntry>> {
        let mut entries = vec![];
        for conversation in self.conversations_for(user_id).await? {
            let Some(other_id) = conversation.other_participant(user_id) else {
                continue;
            };
            let Some(listing) = self.find_listing(&conversation.listing_id).await? else {
                continue;
            };
            let other_participant = match self.user(other_id).await {
                Ok(user) => user,
                Err(AppError::NotFound(_)) => {
                    warn!("c/{} refers to missing u/{other_id}", conversation.id);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let last_message = self
                .retry
                .run("load last message", || fetch_last_message(&self.pool, &conversation.id))
                .await?;

            entries.push(InboxEntry {
                conversation,
                listing,
                other_participant,
                last_message,
            });
        }
        Ok(entries)
    }

    pub(super) async fn participants_for_listing(&self, listing_id: &str) -> AppResult<Vec<String>> {
        let pairs: Vec<(String, String)> =
            sqlx::query_as("SELECT participant_a,participant_b FROM conversations WHERE listing_id=?")
                .bind(listing_id)
                .fetch_all(&self.pool)
                .await?;

        let mut participants: Vec<String> = pairs.into_iter().flat_map(|(a, b)| [a, b]).collect();
        participants.sort();
        participants.dedup();
        Ok(participants)
    }

    /// Live message list for an open thread.
    pub async fn watch_thread(&self, actor: &str, id: &str) -> AppResult<Subscription<Vec<Message>>> {
        self.conversation(actor, id).await?;

        let store = self.clone();
        let (actor, id) = (actor.to_owned(), id.to_owned());
        Ok(self.hub.subscribe(Topic::Conversation(id.clone()), move || {
            let (store, actor, id) = (store.clone(), actor.clone(), id.clone());
            async move { store.messages(&actor, &id).await }
        }))
    }

    /// Live inbox for `user_id`.
    pub fn watch_inbox(&self, user_id: &str) -> Subscription<Vec<InboxEntry>> {
        let store = self.clone();
        let user_id = user_id.to_owned();
        self.hub.subscribe(Topic::Inbox(user_id.clone()), move || {
            let (store, user_id) = (store.clone(), user_id.clone());
            async move { store.inbox(&user_id).await }
        })
    }

    /// Live set of active listings.
    pub fn watch_listings(&self) -> Subscription<Vec<Listing>> {
        let store = self.clone();
        self.hub.subscribe(Topic::Listings, move || {
            let store = store.clone();
            async move { store.active_listings().await }
        })
    }
}
