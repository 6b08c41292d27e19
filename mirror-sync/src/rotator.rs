//! Round-robin credential rotation with retry on rate limiting.

use mirror_core::ApiKey;

use crate::error::SyncError;

/// Cycles through a target's API keys.
///
/// The cursor advances on every attempt and persists across calls, so
/// successive calls start from different keys.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    keys: Vec<ApiKey>,
    cursor: usize,
}

impl CredentialRotator {
    pub fn new(keys: Vec<ApiKey>) -> Self {
        Self { keys, cursor: 0 }
    }

    /// Run `op` with successive keys until it succeeds or fails with
    /// anything other than a rate limit.
    ///
    /// One immediate sweep over the pool at most; after every key has been
    /// rate limited the call fails with [`SyncError::CredentialsExhausted`].
    pub fn with_retry<T>(
        &mut self,
        mut op: impl FnMut(&ApiKey) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        let attempts = self.keys.len();
        for attempt in 1..=attempts {
            let key = &self.keys[self.cursor];
            self.cursor = (self.cursor + 1) % attempts;
            match op(key) {
                Err(err) if err.is_rate_limited() => {
                    tracing::warn!("key {key} rate limited (attempt {attempt}/{attempts})");
                }
                other => return other,
            }
        }
        Err(SyncError::CredentialsExhausted { attempts })
    }
}
