//! Admin bootstrap and small persisted config values.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::errors::CoreResult;

use super::Store;

const ADMIN_TOKEN_KEY: &str = "admin_token";

impl Store {
    /// Returns the admin token, generating and persisting one on first
    /// boot. Idempotent across restarts: a second call on the same
    /// database returns the same token.
    pub async fn bootstrap_admin_token(&self) -> CoreResult<String> {
        self.run(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT config_value FROM admin_config WHERE config_key = ?1",
                    params![ADMIN_TOKEN_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(token) = existing {
                return Ok(token);
            }
            let token = format!("admin-{}", Uuid::new_v4());
            conn.execute(
                "INSERT INTO admin_config (config_key, config_value) VALUES (?1, ?2)",
                params![ADMIN_TOKEN_KEY, token],
            )?;
            Ok(token)
        })
        .await
    }

    /// The bootstrapped admin token, if `bootstrap_admin_token` has already
    /// run at least once on this database.
    pub async fn get_admin_token(&self) -> CoreResult<Option<String>> {
        self.get_config_value(ADMIN_TOKEN_KEY).await
    }

    pub async fn get_config_value(&self, key: &str) -> CoreResult<Option<String>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT config_value FROM admin_config WHERE config_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    pub async fn set_config_value(&self, key: &str, value: &str) -> CoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO admin_config (config_key, config_value) VALUES (?1, ?2)
                 ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = store.bootstrap_admin_token().await.unwrap();
        let second = store.bootstrap_admin_token().await.unwrap();
        assert_eq!(first, second);
    }
}
