//! Table definitions and required indexes.

pub const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS admin_config (
    config_key   TEXT PRIMARY KEY,
    config_value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    agent_id           TEXT PRIMARY KEY,
    token              TEXT NOT NULL UNIQUE,
    capabilities       TEXT NOT NULL,
    status             TEXT NOT NULL,
    current_task       TEXT,
    working_directory  TEXT NOT NULL,
    color              TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    terminated_at      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_agents_token ON agents(token);

CREATE TABLE IF NOT EXISTS tasks (
    task_id      TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    assigned_to  TEXT,
    created_by   TEXT NOT NULL,
    status       TEXT NOT NULL,
    priority     TEXT NOT NULL,
    parent_task  TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_assigned_to ON tasks(assigned_to);
CREATE INDEX IF NOT EXISTS idx_tasks_parent_task ON tasks(parent_task);

CREATE TABLE IF NOT EXISTS task_notes (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id   TEXT NOT NULL,
    ts        TEXT NOT NULL,
    author    TEXT NOT NULL,
    content   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_task_notes_task_id ON task_notes(task_id);

CREATE TABLE IF NOT EXISTS task_dependencies (
    task_id            TEXT NOT NULL,
    depends_on_task_id TEXT NOT NULL,
    PRIMARY KEY (task_id, depends_on_task_id)
);

CREATE TABLE IF NOT EXISTS agent_actions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id    TEXT NOT NULL,
    action_type TEXT NOT NULL,
    task_id     TEXT,
    timestamp   TEXT NOT NULL,
    details     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agent_actions_agent_id ON agent_actions(agent_id);
CREATE INDEX IF NOT EXISTS idx_agent_actions_task_id ON agent_actions(task_id);

CREATE TABLE IF NOT EXISTS project_context (
    context_key  TEXT PRIMARY KEY,
    value        TEXT NOT NULL,
    description  TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    updated_by   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_metadata (
    filepath      TEXT PRIMARY KEY,
    metadata      TEXT NOT NULL,
    last_updated  TEXT NOT NULL,
    updated_by    TEXT NOT NULL,
    content_hash  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_messages (
    message_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id    TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    content      TEXT NOT NULL,
    message_type TEXT NOT NULL,
    priority     TEXT NOT NULL,
    timestamp    TEXT NOT NULL,
    delivered    INTEGER NOT NULL DEFAULT 0,
    read         INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_agent_messages_recipient ON agent_messages(recipient_id);

CREATE TABLE IF NOT EXISTS mcp_session_persistence (
    mcp_session_id       TEXT PRIMARY KEY,
    transport_state      TEXT NOT NULL,
    created_at           TEXT NOT NULL,
    last_heartbeat       TEXT NOT NULL,
    status               TEXT NOT NULL,
    disconnected_at      TEXT,
    grace_period_expires TEXT,
    recovery_attempts    INTEGER NOT NULL DEFAULT 0,
    working_directory    TEXT NOT NULL,
    metadata             TEXT NOT NULL,
    agent_context        TEXT,
    conversation_state   TEXT
);

CREATE TABLE IF NOT EXISTS session_agent_state (
    agent_id       TEXT NOT NULL,
    mcp_session_id TEXT NOT NULL,
    state_key      TEXT NOT NULL,
    state_value    TEXT NOT NULL,
    last_updated   TEXT NOT NULL,
    expires_at     TEXT,
    PRIMARY KEY (agent_id, mcp_session_id, state_key)
);
"#;
