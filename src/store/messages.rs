//! Inter-agent mailbox.

use chrono::Utc;
use rusqlite::params;

use crate::errors::CoreResult;
use crate::types::{AgentMessage, Priority};

use super::Store;

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<AgentMessage> {
    let priority_str: String = row.get("priority")?;
    Ok(AgentMessage {
        message_id: row.get("message_id")?,
        sender_id: row.get("sender_id")?,
        recipient_id: row.get("recipient_id")?,
        content: row.get("content")?,
        message_type: row.get("message_type")?,
        priority: Priority::parse(&priority_str).unwrap_or(Priority::Medium),
        timestamp: row.get("timestamp")?,
        delivered: row.get::<_, i64>("delivered")? != 0,
        read: row.get::<_, i64>("read")? != 0,
    })
}

impl Store {
    pub async fn send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
        message_type: &str,
        priority: Priority,
    ) -> CoreResult<i64> {
        let sender_id = sender_id.to_string();
        let recipient_id = recipient_id.to_string();
        let content = content.to_string();
        let message_type = message_type.to_string();
        let now = Utc::now();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO agent_messages (sender_id, recipient_id, content, message_type,
                     priority, timestamp, delivered, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0)",
                params![
                    sender_id,
                    recipient_id,
                    content,
                    message_type,
                    priority.as_str(),
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn list_messages_for_agent(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> CoreResult<Vec<AgentMessage>> {
        let recipient_id = recipient_id.to_string();
        self.run(move |conn| {
            let sql = if unread_only {
                "SELECT * FROM agent_messages WHERE recipient_id = ?1 AND read = 0 ORDER BY timestamp"
            } else {
                "SELECT * FROM agent_messages WHERE recipient_id = ?1 ORDER BY timestamp"
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![recipient_id], row_to_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    pub async fn mark_message_delivered(&self, message_id: i64) -> CoreResult<()> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE agent_messages SET delivered = 1 WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_message_read(&self, message_id: i64) -> CoreResult<()> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE agent_messages SET read = 1 WHERE message_id = ?1",
                params![message_id],
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
    async fn send_then_list_unread_only() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .send_message("admin", "agent-1", "hi", "note", Priority::Low)
            .await
            .unwrap();
        let unread = store
            .list_messages_for_agent("agent-1", true)
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        store.mark_message_read(id).await.unwrap();
        let unread = store
            .list_messages_for_agent("agent-1", true)
            .await
            .unwrap();
        assert!(unread.is_empty());
    }
}
