use crate::backend::SlotBackend;
use crate::error::SlotError;
use crate::schema::{bookings, slots, CREATE_TABLES};
use crate::types::{BookedBy, Booking, Customer, Slot, SlotKey};
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Queryable, Selectable)]
#[diesel(table_name = slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SlotRow {
    id: Uuid,
    date: String,
    time: String,
    booked: bool,
    name: Option<String>,
    phone: Option<String>,
    note: Option<String>,
    booked_at: Option<DateTime<Utc>>,
}

/// The `booked` column is authoritative. A booked row without customer details
/// is reported as a storage failure rather than offered for booking again.
impl TryFrom<SlotRow> for Slot {
    type Error = SlotError;

    fn try_from(row: SlotRow) -> Result<Self, SlotError> {
        let booked_by = match (row.booked, row.name, row.booked_at) {
            (false, _, _) => None,
            (true, Some(name), Some(booked_at)) => Some(BookedBy {
                name,
                phone: row.phone,
                note: row.note,
                booked_at,
            }),
            (true, _, _) => {
                return Err(SlotError::StorageUnavailable(format!(
                    "slot {} {} is booked without customer details",
                    row.date, row.time
                )))
            }
        };
        Ok(Slot {
            id: row.id,
            date: row.date,
            time: row.time,
            booked: row.booked,
            booked_by,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = slots)]
struct NewSlot<'a> {
    id: Uuid,
    date: &'a str,
    time: &'a str,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct BookingRow {
    id: Uuid,
    slot_id: Uuid,
    date: String,
    time: String,
    name: String,
    phone: Option<String>,
    note: Option<String>,
    booked_at: DateTime<Utc>,
}

impl From<Booking> for BookingRow {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            slot_id: booking.slot_id,
            date: booking.date,
            time: booking.time,
            name: booking.name,
            phone: booking.phone,
            note: booking.note,
            booked_at: booking.booked_at,
        }
    }
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            slot_id: row.slot_id,
            date: row.date,
            time: row.time,
            name: row.name,
            phone: row.phone,
            note: row.note,
            booked_at: row.booked_at,
        }
    }
}

fn log_booking_outcome(key: &SlotKey, result: &Result<Slot, SlotError>) {
    match result {
        Ok(_) => info!(date = %key.date, time = %key.time, "Slot booked"),
        Err(SlotError::StorageUnavailable(details)) => {
            error!(%details, date = %key.date, time = %key.time, "Booking failed")
        }
        Err(err) => warn!(%err, date = %key.date, time = %key.time, "Booking rejected"),
    }
}

/// PostgreSQL backed slots. Uniqueness comes from the `(date, time)` index,
/// booking exclusivity from a row lock taken inside the booking transaction.
#[derive(Clone)]
pub struct DatabaseInterface {
    pool: PgPool,
}

impl DatabaseInterface {
    pub fn new(database_url: &str, pool_size: u32) -> Result<Self, SlotError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let database_interface = Self { pool };
        database_interface.create_tables()?;
        Ok(database_interface)
    }

    fn create_tables(&self) -> Result<(), SlotError> {
        let mut connection = self.pool.get()?;
        connection.batch_execute(CREATE_TABLES)?;
        info!("Database tables ready");
        Ok(())
    }
}

impl SlotBackend for DatabaseInterface {
    fn slots(&self, date: Option<&str>) -> Result<Vec<Slot>, SlotError> {
        let mut connection = self.pool.get()?;

        let mut query = slots::table
            .select(SlotRow::as_select())
            .order((slots::date.asc(), slots::time.asc()))
            .into_boxed();
        if let Some(date) = date {
            query = query.filter(slots::date.eq(date));
        }

        let rows = query.load(&mut *connection)?;
        rows.into_iter().map(Slot::try_from).collect()
    }

    fn add_slot(&self, key: SlotKey) -> Result<Slot, SlotError> {
        let mut connection = self.pool.get()?;
        let new_slot = NewSlot {
            id: Uuid::new_v4(),
            date: &key.date,
            time: &key.time,
        };

        let row = diesel::insert_into(slots::table)
            .values(&new_slot)
            .on_conflict((slots::date, slots::time))
            .do_nothing()
            .returning(SlotRow::as_returning())
            .get_result(&mut *connection)
            .optional()?;

        match row {
            Some(row) => {
                info!(date = %key.date, time = %key.time, "Slot added");
                row.try_into()
            }
            None => {
                warn!(date = %key.date, time = %key.time, "Slot already exists");
                Err(SlotError::AlreadyExists)
            }
        }
    }

    fn delete_slot(&self, key: &SlotKey) -> Result<Slot, SlotError> {
        let mut connection = self.pool.get()?;

        let row = diesel::delete(
            slots::table
                .filter(slots::date.eq(&key.date))
                .filter(slots::time.eq(&key.time)),
        )
        .returning(SlotRow::as_returning())
        .get_result(&mut *connection)
        .optional()?;

        match row {
            Some(row) => {
                info!(date = %key.date, time = %key.time, "Slot deleted");
                row.try_into()
            }
            None => {
                warn!(date = %key.date, time = %key.time, "Slot to delete does not exist");
                Err(SlotError::NotFound)
            }
        }
    }

    fn book_slot(&self, key: &SlotKey, customer: Customer) -> Result<Slot, SlotError> {
        let mut pooled = self.pool.get()?;
        let connection: &mut PgConnection = &mut pooled;

        let result = connection.transaction::<Slot, SlotError, _>(|connection| {
            let row = slots::table
                .select(SlotRow::as_select())
                .filter(slots::date.eq(&key.date))
                .filter(slots::time.eq(&key.time))
                .for_update()
                .first(connection)
                .optional()?;

            let Some(row) = row else {
                return Err(SlotError::NotFound);
            };
            let slot = Slot::try_from(row)?;
            if slot.booked {
                return Err(SlotError::AlreadyBooked);
            }

            let (booked, booking) = slot.with_booking(customer, Utc::now());
            diesel::update(slots::table.find(booked.id))
                .set((
                    slots::booked.eq(true),
                    slots::name.eq(Some(booking.name.as_str())),
                    slots::phone.eq(booking.phone.as_deref()),
                    slots::note.eq(booking.note.as_deref()),
                    slots::booked_at.eq(Some(booking.booked_at)),
                ))
                .execute(connection)?;
            diesel::insert_into(bookings::table)
                .values(BookingRow::from(booking))
                .execute(connection)?;

            Ok(booked)
        });

        log_booking_outcome(key, &result);
        result
    }

    fn bookings(&self) -> Result<Vec<Booking>, SlotError> {
        let mut connection = self.pool.get()?;
        let rows = bookings::table
            .select(BookingRow::as_select())
            .order(bookings::booked_at.asc())
            .load(&mut *connection)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }
}
