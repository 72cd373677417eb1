//! Postgres schema, applied idempotently at start-up.

/// Tables and indexes for PVZs, receptions, products and users.
///
/// `receptions_one_in_progress` allows at most one in-progress reception per
/// PVZ. `products.seq` breaks `added_at` ties so "last added" is strict.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS pvz (
    id                UUID PRIMARY KEY,
    city              TEXT NOT NULL,
    registration_date TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
);

CREATE INDEX IF NOT EXISTS pvz_registration_order
    ON pvz (registration_date, id);

CREATE TABLE IF NOT EXISTS receptions (
    id        UUID PRIMARY KEY,
    pvz_id    UUID NOT NULL REFERENCES pvz (id),
    opened_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    status    TEXT NOT NULL CHECK (status IN ('in_progress', 'closed')),
    closed_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS receptions_one_in_progress
    ON receptions (pvz_id) WHERE status = 'in_progress';

CREATE INDEX IF NOT EXISTS receptions_by_pvz_opened
    ON receptions (pvz_id, opened_at);

CREATE TABLE IF NOT EXISTS products (
    id           UUID PRIMARY KEY,
    reception_id UUID NOT NULL REFERENCES receptions (id),
    product_type TEXT NOT NULL,
    added_at     TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    seq          BIGSERIAL NOT NULL
);

CREATE INDEX IF NOT EXISTS products_lifo
    ON products (reception_id, added_at DESC, seq DESC);

CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('employee', 'moderator')),
    created_at    TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
);
"#;
