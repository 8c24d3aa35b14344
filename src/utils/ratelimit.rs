use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serenity::model::id::UserId;
use tokio::sync::Mutex;

lazy_static! {
    static ref COMMAND_COOLDOWNS: Mutex<CooldownTracker<(UserId, String)>> =
        Mutex::new(CooldownTracker::new(COOLDOWN_SECONDS));
}

const COOLDOWN_SECONDS: u64 = 3;
/// Expired entries are swept at most this often
const PRUNE_INTERVAL_SECONDS: u64 = 60;

/// Remembers when each key last ran and when it was last warned.
///
/// Entries whose cooldown has passed are dropped periodically, so the maps
/// only hold keys that ran within the last window.
pub struct CooldownTracker<K> {
    cooldown: u64,
    last_run: HashMap<K, u64>,
    last_warning: HashMap<K, u64>,
    last_prune: u64,
}

impl<K: std::hash::Hash + Eq + Clone> CooldownTracker<K> {
    pub fn new(cooldown: u64) -> Self {
        Self {
            cooldown,
            last_run: HashMap::new(),
            last_warning: HashMap::new(),
            last_prune: 0,
        }
    }

    /// Ok(()) and records the run if the cooldown has passed.
    /// Otherwise Err((remaining_seconds, should_warn)); `should_warn` is true
    /// only for the first violation within one cooldown window.
    pub fn check(&mut self, key: &K, now: u64) -> Result<(), (u64, bool)> {
        if now.saturating_sub(self.last_prune) >= PRUNE_INTERVAL_SECONDS {
            self.prune(now);
        }

        if let Some(&last_time) = self.last_run.get(key) {
            let elapsed = now.saturating_sub(last_time);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                let should_warn = match self.last_warning.get(key) {
                    Some(&last_warning) => last_warning < last_time,
                    None => true,
                };
                if should_warn {
                    self.last_warning.insert(key.clone(), now);
                }
                return Err((remaining, should_warn));
            }
        }

        self.last_run.insert(key.clone(), now);
        Ok(())
    }

    /// Forget keys whose cooldown has passed; they would be allowed anyway
    fn prune(&mut self, now: u64) {
        let cooldown = self.cooldown;
        self.last_run
            .retain(|_, &mut last_time| now.saturating_sub(last_time) < cooldown);
        let last_run = &self.last_run;
        self.last_warning.retain(|key, _| last_run.contains_key(key));
        self.last_prune = now;
    }
}

/// Check if a user can execute a command (cooldown not active)
pub async fn check_cooldown(user_id: UserId, command: &str) -> Result<(), (u64, bool)> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    COMMAND_COOLDOWNS
        .lock()
        .await
        .check(&(user_id, command.to_string()), now)
}
