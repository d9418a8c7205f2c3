use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct Window {
    attempts: u32,
    resets_at: Instant,
}

/// Fixed-window counter of failed login attempts per key.
///
/// Keys are built by the login handler from the normalized email and the
/// client address, so one noisy client cannot lock out another.
#[derive(Clone)]
pub struct LoginThrottle {
    max_attempts: u32,
    decay: Duration,
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, decay: Duration) -> Self {
        Self {
            max_attempts,
            decay,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn key(email: &str, ip: &str) -> String {
        format!("{}|{}", email.trim().to_lowercase(), ip)
    }

    pub async fn too_many_attempts(&self, key: &str) -> bool {
        let windows = self.windows.read().await;
        match windows.get(key) {
            Some(window) if window.resets_at > Instant::now() => window.attempts >= self.max_attempts,
            _ => false,
        }
    }

    /// Record a failed attempt, returning the count in the current window
    pub async fn hit(&self, key: &str) -> u32 {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        // Expired windows are dropped opportunistically
        windows.retain(|_, w| w.resets_at > now);
        let window = windows.entry(key.to_string()).or_insert(Window {
            attempts: 0,
            resets_at: now + self.decay,
        });
        window.attempts += 1;
        window.attempts
    }

    pub async fn clear(&self, key: &str) {
        self.windows.write().await.remove(key);
    }

    /// Seconds until the key's window resets
    pub async fn available_in(&self, key: &str) -> u64 {
        let windows = self.windows.read().await;
        windows
            .get(key)
            .map(|w| w.resets_at.saturating_duration_since(Instant::now()))
            .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locks_after_max_attempts_and_clears() {
        let throttle = LoginThrottle::new(3, Duration::from_secs(60));
        let key = LoginThrottle::key(" Ada@Example.com", "127.0.0.1");
        assert_eq!(key, "ada@example.com|127.0.0.1");

        for _ in 0..2 {
            throttle.hit(&key).await;
        }
        assert!(!throttle.too_many_attempts(&key).await);
        assert_eq!(throttle.hit(&key).await, 3);
        assert!(throttle.too_many_attempts(&key).await);
        assert!(throttle.available_in(&key).await > 0);

        throttle.clear(&key).await;
        assert!(!throttle.too_many_attempts(&key).await);
        assert_eq!(throttle.available_in(&key).await, 0);
    }

    #[tokio::test]
    async fn windows_expire() {
        let throttle = LoginThrottle::new(1, Duration::from_millis(20));
        throttle.hit("k").await;
        assert!(throttle.too_many_attempts("k").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!throttle.too_many_attempts("k").await);
        assert_eq!(throttle.hit("k").await, 1);
    }
}
