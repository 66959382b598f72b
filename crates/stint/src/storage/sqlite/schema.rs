//! Database schema definition for the `SQLite` store.

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
-- Projects with their settings and round-robin cursor
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    auto_assignment INTEGER NOT NULL DEFAULT 0,
    assignment_method TEXT NOT NULL DEFAULT 'round_robin',
    default_priority TEXT NOT NULL DEFAULT 'medium',
    default_status TEXT NOT NULL DEFAULT 'todo',
    require_description INTEGER NOT NULL DEFAULT 1,
    last_assigned_index INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Members in join order; position drives round-robin
CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    role TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

-- Issues; parent_id has no foreign key, children are removed by the engine
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    parent_id TEXT,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    priority TEXT NOT NULL,
    status TEXT NOT NULL,
    assignee TEXT,
    reporter TEXT,
    creator TEXT,
    start_date TEXT,
    due_date TEXT,
    done_date TEXT,
    label TEXT,
    description TEXT,
    goal TEXT,
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issues_scope ON issues(project_id, parent_id, order_index);
CREATE INDEX IF NOT EXISTS idx_issues_parent ON issues(parent_id);
CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee) WHERE assignee IS NOT NULL;

-- Append-only audit log; seq gives insertion order
CREATE TABLE IF NOT EXISTS recent_activities (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    project_id TEXT,
    issue_id TEXT,
    comment_id TEXT,
    item_id TEXT,
    type TEXT NOT NULL,
    old_values TEXT,
    new_values TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activities_issue ON recent_activities(issue_id);
";
