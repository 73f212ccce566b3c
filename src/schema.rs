diesel::table! {
    slots (id) {
        id -> Uuid,
        date -> Varchar,
        time -> Varchar,
        booked -> Bool,
        name -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        note -> Nullable<Text>,
        booked_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        slot_id -> Uuid,
        date -> Varchar,
        time -> Varchar,
        name -> Varchar,
        phone -> Nullable<Varchar>,
        note -> Nullable<Text>,
        booked_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(slots, bookings);

/// Executed on every start, so it must stay idempotent.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS slots (
    id UUID PRIMARY KEY,
    date VARCHAR(20) NOT NULL,
    time VARCHAR(20) NOT NULL,
    booked BOOLEAN NOT NULL DEFAULT false,
    name VARCHAR(200),
    phone VARCHAR(50),
    note TEXT,
    booked_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_slots_date_time ON slots (date, time);

CREATE TABLE IF NOT EXISTS bookings (
    id UUID PRIMARY KEY,
    slot_id UUID NOT NULL,
    date VARCHAR(20) NOT NULL,
    time VARCHAR(20) NOT NULL,
    name VARCHAR(200) NOT NULL,
    phone VARCHAR(50),
    note TEXT,
    booked_at TIMESTAMPTZ NOT NULL
);
"#;
