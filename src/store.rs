use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Pattern, SavedPattern, SharedPattern};

const SHARE_CODE_LEN: usize = 8;

/// Key-value home for patterns the user keeps or hands out.
pub trait PatternStore: Send + Sync {
    fn save(&self, pattern: Pattern) -> SavedPattern;
    fn saved(&self) -> Vec<SavedPattern>;
    fn get_saved(&self, id: Uuid) -> Option<SavedPattern>;
    fn delete_saved(&self, id: Uuid) -> bool;
    fn share(&self, pattern: Pattern) -> SharedPattern;
    fn get_shared(&self, code: &str) -> Option<SharedPattern>;
}

#[derive(Default)]
pub struct InMemoryPatternStore {
    saved: RwLock<Vec<SavedPattern>>,
    shared: RwLock<HashMap<String, SharedPattern>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn new_share_code() -> String {
    let mut code = URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes());
    code.truncate(SHARE_CODE_LEN);
    code
}

impl PatternStore for InMemoryPatternStore {
    fn save(&self, pattern: Pattern) -> SavedPattern {
        let entry = SavedPattern { id: Uuid::new_v4(), saved_at: Utc::now(), pattern };
        self.saved.write().push(entry.clone());
        tracing::info!("💾 Saved pattern '{}' as {}", entry.pattern.title, entry.id);
        entry
    }

    fn saved(&self) -> Vec<SavedPattern> {
        self.saved.read().clone()
    }

    fn get_saved(&self, id: Uuid) -> Option<SavedPattern> {
        self.saved.read().iter().find(|p| p.id == id).cloned()
    }

    fn delete_saved(&self, id: Uuid) -> bool {
        let mut guard = self.saved.write();
        let before = guard.len();
        guard.retain(|p| p.id != id);
        before != guard.len()
    }

    fn share(&self, pattern: Pattern) -> SharedPattern {
        let mut guard = self.shared.write();
        let mut code = new_share_code();
        while guard.contains_key(&code) {
            code = new_share_code();
        }
        let entry = SharedPattern { id: code.clone(), shared_at: Utc::now(), pattern };
        guard.insert(code, entry.clone());
        tracing::info!("🔗 Shared pattern '{}' as {}", entry.pattern.title, entry.id);
        entry
    }

    fn get_shared(&self, code: &str) -> Option<SharedPattern> {
        self.shared.read().get(code).cloned()
    }
}
