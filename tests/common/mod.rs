#![allow(dead_code)]

use std::path::{Path, PathBuf};

use badgerexchange::{
    models::{Listing, NewListing, NewUser, UserProfile},
    store::Store,
};

pub async fn store() -> Store {
    Store::in_memory().await.unwrap()
}

/// A fresh on-disk store with a real connection pool, for tests that need
/// writers to overlap.
pub async fn file_store(name: &str, max_connections: u32) -> (Store, PathBuf) {
    let path = std::env::temp_dir().join(format!("badgerexchange-{name}-{}.db", std::process::id()));
    remove_db(&path);

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let store = Store::connect(&url, max_connections).await.unwrap();
    store.migrate().await.unwrap();
    (store, path)
}

pub fn remove_db(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub async fn user(store: &Store, name: &str, preferred: &[&str]) -> UserProfile {
    store
        .create_user(NewUser {
            name: name.to_owned(),
            email: format!("{}@wisc.edu", name.to_lowercase()),
            avatar_url: None,
            preferred_categories: preferred.iter().map(|t| t.to_string()).collect(),
        })
        .await
        .unwrap()
}

pub fn draft(title: &str, tags: &[&str]) -> NewListing {
    NewListing {
        title: title.to_owned(),
        description: "Gently used and picked up from a dorm on campus.".to_owned(),
        price: 40.0,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        images: vec![],
    }
}

pub async fn listing(store: &Store, seller: &UserProfile, title: &str, tags: &[&str]) -> Listing {
    store.create_listing(&seller.id, draft(title, tags)).await.unwrap()
}
