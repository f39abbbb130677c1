use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

pub const MIN_FONT_SIZE_LEVEL: u8 = 0;
pub const MAX_FONT_SIZE_LEVEL: u8 = 7;

/// Per-user display preferences, kept in memory for the session. One small
/// entry per account at most, so no eviction is needed here.
#[derive(Clone)]
pub struct PreferenceStore {
    default_font_level: u8,
    levels: Arc<RwLock<HashMap<Uuid, u8>>>,
}

impl PreferenceStore {
    pub fn new(default_font_level: u8) -> Self {
        Self {
            default_font_level: clamp_font_level(default_font_level),
            levels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn font_level(&self, user_id: Uuid) -> u8 {
        self.levels
            .read()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or(self.default_font_level)
    }

    /// Stores a new level, clamped to the supported range, and returns the
    /// value actually applied.
    pub async fn set_font_level(&self, user_id: Uuid, level: u8) -> u8 {
        let level = clamp_font_level(level);
        self.levels.write().await.insert(user_id, level);
        level
    }
}

fn clamp_font_level(level: u8) -> u8 {
    level.clamp(MIN_FONT_SIZE_LEVEL, MAX_FONT_SIZE_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_gets_the_default_level() {
        let store = PreferenceStore::new(3);
        assert_eq!(store.font_level(Uuid::new_v4()).await, 3);
    }

    #[tokio::test]
    async fn levels_are_clamped_per_user() {
        let store = PreferenceStore::new(3);
        let user = Uuid::new_v4();
        assert_eq!(store.set_font_level(user, 99).await, MAX_FONT_SIZE_LEVEL);
        assert_eq!(store.font_level(user).await, MAX_FONT_SIZE_LEVEL);
        assert_eq!(store.set_font_level(user, 2).await, 2);
        assert_eq!(store.font_level(user).await, 2);
        assert_eq!(store.font_level(Uuid::new_v4()).await, 3);
    }
}
