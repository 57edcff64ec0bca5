use rusqlite_migration::{M, Migrations};

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "CREATE TABLE snapshots (
            database_name     TEXT PRIMARY KEY,
            last_commit_hash  TEXT,
            synced_at         TEXT NOT NULL
        );

        CREATE TABLE files (
            database_name   TEXT NOT NULL,
            path            TEXT NOT NULL,
            position        INTEGER NOT NULL,
            kind            TEXT NOT NULL,
            sha             TEXT NOT NULL,
            size            INTEGER NOT NULL,
            text            TEXT,
            last_modified   TEXT,
            PRIMARY KEY (database_name, path),
            FOREIGN KEY (database_name) REFERENCES snapshots(database_name)
        );

        CREATE INDEX idx_files_kind ON files(database_name, kind);

        CREATE TABLE directory_handles (
            key   TEXT PRIMARY KEY,
            path  TEXT NOT NULL
        );",
    )])
}
