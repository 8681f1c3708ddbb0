//! Token issuance and the process-wide token/agent-id bijection.
//!
//! Follows the `Arc<RwLock<HashMap<...>>>` shared-state idiom
//! (`src/session/coordinator.rs`), swapped for `dashmap` since the index is
//! read far more often than written and every entry is keyed independently.

use dashmap::DashMap;
use rand::Rng;

use crate::errors::{CoreError, CoreResult};
use crate::types::canonical_admin_id;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LEN: usize = 32;

/// Generates an opaque bearer token, e.g. for a freshly created agent.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Last 4 characters of a token, used to build deterministic tmux session
/// names without embedding the full secret in a shell argument
/// a process-listing tool could read.
pub fn last4(token: &str) -> String {
    let len = token.len();
    if len <= 4 {
        token.to_string()
    } else {
        token[len - 4..].to_string()
    }
}

/// O(1) token <-> agent_id bijection shared by every request handler that
/// needs to authenticate a bearer token.
#[derive(Default)]
pub struct AuthIndex {
    token_to_agent: DashMap<String, String>,
    agent_to_token: DashMap<String, String>,
}

impl AuthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agent_id: &str, token: &str) {
        self.token_to_agent
            .insert(token.to_string(), agent_id.to_string());
        self.agent_to_token
            .insert(agent_id.to_string(), token.to_string());
    }

    pub fn remove_agent(&self, agent_id: &str) {
        if let Some((_, token)) = self.agent_to_token.remove(agent_id) {
            self.token_to_agent.remove(&token);
        }
    }

    pub fn agent_for_token(&self, token: &str) -> Option<String> {
        self.token_to_agent.get(token).map(|e| e.value().clone())
    }

    pub fn token_for_agent(&self, agent_id: &str) -> Option<String> {
        self.agent_to_token.get(agent_id).map(|e| e.value().clone())
    }

    /// Resolves a bearer token to a canonical agent id, or `ErrAuth` if the
    /// token is unknown.
    pub fn authenticate(&self, token: &str) -> CoreResult<String> {
        self.agent_for_token(token)
            .map(|id| canonical_admin_id(&id))
            .ok_or_else(|| CoreError::Auth("unrecognized bearer token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_fixed_length_and_alphabet() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn last4_handles_short_tokens() {
        assert_eq!(last4("ab"), "ab");
        assert_eq!(last4("abcdef"), "cdef");
    }

    #[test]
    fn bijection_round_trips_and_removes_cleanly() {
        let idx = AuthIndex::new();
        idx.insert("agent-1", "tok-1");
        assert_eq!(idx.agent_for_token("tok-1").as_deref(), Some("agent-1"));
        assert_eq!(idx.token_for_agent("agent-1").as_deref(), Some("tok-1"));
        idx.remove_agent("agent-1");
        assert!(idx.agent_for_token("tok-1").is_none());
    }

    #[test]
    fn authenticate_rejects_unknown_token() {
        let idx = AuthIndex::new();
        let err = idx.authenticate("nope").unwrap_err();
        assert_eq!(err.kind(), "ErrAuth");
    }
}
