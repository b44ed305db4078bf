use crate::domain::value_objects::AuthorId;
use crate::ports::author_service::{Author, AuthorService as AuthorServiceTrait, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mock implementation of AuthorService
///
/// Supports stateful testing by storing authors in memory.
/// Lookups can be switched to fail to exercise the fan-out failure policy.
pub struct AuthorService {
    authors: Mutex<HashMap<AuthorId, Author>>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl AuthorService {
    pub fn new() -> Self {
        Self {
            authors: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Register an author for testing purposes and return its id
    pub fn add_author(&self, name: &str) -> AuthorId {
        let now = Utc::now();
        let author = Author {
            id: AuthorId::new(),
            name: name.to_string(),
            biography: String::new(),
            birth_date: None,
            created_at: now,
            updated_at: now,
        };
        let id = author.id;
        if let Ok(mut authors) = self.authors.lock() {
            authors.insert(id, author);
        }
        id
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of get_author calls served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Default for AuthorService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthorServiceTrait for AuthorService {
    async fn get_author(&self, author_id: AuthorId) -> Result<Author> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("author service unavailable".into());
        }

        let authors = self.authors.lock().map_err(|_| "author directory lock poisoned")?;
        authors
            .get(&author_id)
            .cloned()
            .ok_or_else(|| format!("author {} not found", author_id.value()).into())
    }

    async fn find_author_ids(&self, name_query: &str) -> Result<Vec<AuthorId>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("author service unavailable".into());
        }

        let needle = name_query.to_lowercase();
        let authors = self.authors.lock().map_err(|_| "author directory lock poisoned")?;
        Ok(authors
            .values()
            .filter(|a| a.name.to_lowercase().contains(&needle))
            .map(|a| a.id)
            .collect())
    }
}
