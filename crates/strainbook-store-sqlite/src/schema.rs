//! SQL schema for the strainbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- AUTOINCREMENT so the id of a strain deleted by a merge is never reused.
CREATE TABLE IF NOT EXISTS strains (
    strain_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    matching_key  TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- The menu currently being transcribed, one row per shop and strain.
CREATE TABLE IF NOT EXISTS menu_entries (
    entry_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    shop_id         INTEGER NOT NULL,
    strain_id       INTEGER NOT NULL REFERENCES strains(strain_id),
    category        TEXT    NOT NULL,   -- 'sativa' | 'indica' | 'hybrid' | 'hash'
    overlay         INTEGER NOT NULL DEFAULT 0,
    price_currency  TEXT    NOT NULL,
    price_cents     INTEGER NOT NULL CHECK (price_cents >= 0),
    note            TEXT    NOT NULL DEFAULT '',
    recorded_at     TEXT    NOT NULL,
    UNIQUE (shop_id, strain_id)
);

-- Everything a shop has ever carried. Rows are never deleted except when a
-- strain merge folds two of them together.
CREATE TABLE IF NOT EXISTS offerings (
    offering_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    shop_id              INTEGER NOT NULL,
    strain_id            INTEGER NOT NULL REFERENCES strains(strain_id),
    category             TEXT    NOT NULL,
    overlay              INTEGER NOT NULL DEFAULT 0,
    price_currency       TEXT    NOT NULL,
    price_cents          INTEGER NOT NULL CHECK (price_cents >= 0),
    note                 TEXT    NOT NULL DEFAULT '',
    status               TEXT    NOT NULL CHECK (status IN ('active', 'discontinued')),
    discontinued_reason  TEXT,
    discontinued_since   TEXT,
    discontinued_until   TEXT,            -- free-text hint, never parsed
    manual_lock          INTEGER NOT NULL DEFAULT 0,
    last_seen            TEXT    NOT NULL,
    created_at           TEXT    NOT NULL,
    updated_at           TEXT    NOT NULL,
    UNIQUE (shop_id, strain_id)
);

CREATE INDEX IF NOT EXISTS menu_entries_shop_idx   ON menu_entries(shop_id);
CREATE INDEX IF NOT EXISTS menu_entries_strain_idx ON menu_entries(strain_id);
CREATE INDEX IF NOT EXISTS offerings_shop_idx      ON offerings(shop_id);
CREATE INDEX IF NOT EXISTS offerings_strain_idx    ON offerings(strain_id);
CREATE INDEX IF NOT EXISTS offerings_status_idx    ON offerings(status);

PRAGMA user_version = 1;
";
