use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use actix_web::{
    cookie::{Cookie, SameSite},
    HttpRequest,
};
use rand::Rng;
use tokio::sync::Mutex;

use crate::flow::Prepared;

pub const COOKIE_NAME: &str = "stock_session";

struct Entry {
    flashes: Vec<String>,
    prepared: Option<Prepared>,
    touched: Instant,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Entry {
            flashes: Vec::new(),
            prepared: None,
            touched: now,
        }
    }
}

/// Per-visitor state between page transitions, keyed by a random cookie id.
///
/// Holds flash messages and the selection and series fetched on submit,
/// which `/graph` takes exactly once.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

/// The session a request belongs to. `cookie` is set when a new id was issued.
pub struct Session {
    pub id: String,
    pub cookie: Option<Cookie<'static>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Finds the session named by the request cookie, or issues a new id.
    ///
    /// Unknown or expired ids are never adopted; the visitor gets a fresh id
    /// instead. Nothing is stored until the session has something to keep.
    pub async fn resolve(&self, req: &HttpRequest) -> Session {
        let now = Instant::now();

        if let Some(cookie) = req.cookie(COOKIE_NAME) {
            let mut entries = self.entries.lock().await;
            match entries.get_mut(cookie.value()) {
                Some(entry) if now.duration_since(entry.touched) < self.ttl => {
                    entry.touched = now;
                    return Session {
                        id: cookie.value().to_string(),
                        cookie: None,
                    };
                }
                Some(_) => {
                    entries.remove(cookie.value());
                }
                None => {}
            }
        }

        let id = new_id();
        let cookie = Cookie::build(COOKIE_NAME, id.clone())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();

        Session {
            id,
            cookie: Some(cookie),
        }
    }

    /// Runs `f` on the entry for `id`, creating it if needed. Idle entries
    /// are pruned whenever a new one is stored.
    async fn with_entry(&self, id: &str, f: impl FnOnce(&mut Entry)) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(id) {
            let ttl = self.ttl;
            let before = entries.len();
            entries.retain(|_, entry| now.duration_since(entry.touched) < ttl);
            if entries.len() < before {
                log::debug!("pruned {} idle session(s)", before - entries.len());
            }
        }

        let entry = entries
            .entry(id.to_string())
            .or_insert_with(|| Entry::new(now));
        entry.touched = now;
        f(entry);
    }

    pub async fn flash(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.with_entry(id, |entry| entry.flashes.push(message)).await;
    }

    /// Returns and clears pending flash messages.
    pub async fn take_flashes(&self, id: &str) -> Vec<String> {
        self.entries
            .lock()
            .await
            .get_mut(id)
            .map(|entry| std::mem::take(&mut entry.flashes))
            .unwrap_or_default()
    }

    pub async fn put_prepared(&self, id: &str, prepared: Prepared) {
        self.with_entry(id, |entry| entry.prepared = Some(prepared)).await;
    }

    pub async fn take_prepared(&self, id: &str) -> Option<Prepared> {
        self.entries
            .lock()
            .await
            .get_mut(id)
            .and_then(|entry| entry.prepared.take())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

fn new_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
