use crate::error::SlotError;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

lazy_static! {
    pub static ref DATE_REGEX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    pub static ref TIME_REGEX: Regex = Regex::new(r"^\d{2}:\d{2}$").unwrap();
}

/// Identity of a slot. Ordering is `(date, time)`, which is chronological
/// because both parts are fixed-width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: String,
    pub time: String,
}

impl SlotKey {
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Result<Self, SlotError> {
        let date = date.into();
        let time = time.into();
        if !DATE_REGEX.is_match(&date) {
            return Err(SlotError::InvalidInput(format!(
                "date must be YYYY-MM-DD, got {date:?}"
            )));
        }
        if !TIME_REGEX.is_match(&time) {
            return Err(SlotError::InvalidInput(format!(
                "time must be HH:MM, got {time:?}"
            )));
        }
        Ok(Self { date, time })
    }
}

/// Validated booking input.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: Option<String>,
    pub note: Option<String>,
}

impl Customer {
    /// Omitted, empty and whitespace-only `phone`/`note` all become `None`.
    pub fn new(
        name: impl Into<String>,
        phone: Option<String>,
        note: Option<String>,
    ) -> Result<Self, SlotError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SlotError::InvalidInput("name is required".into()));
        }
        Ok(Self {
            name,
            phone: normalize(phone),
            note: normalize(note),
        })
    }
}

/// Empty and whitespace-only values become `None`.
pub fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedBy {
    pub name: String,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: Uuid,
    pub date: String,
    pub time: String,
    pub booked: bool,
    #[serde(default)]
    pub booked_by: Option<BookedBy>,
}

impl Slot {
    pub fn new(key: SlotKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: key.date,
            time: key.time,
            booked: false,
            booked_by: None,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey {
            date: self.date.clone(),
            time: self.time.clone(),
        }
    }

    /// Returns the booked copy of this slot together with its audit record.
    /// The slot itself is left untouched so callers can commit both or neither.
    pub fn with_booking(&self, customer: Customer, booked_at: DateTime<Utc>) -> (Slot, Booking) {
        let booking = Booking {
            id: Uuid::new_v4(),
            slot_id: self.id,
            date: self.date.clone(),
            time: self.time.clone(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            note: customer.note.clone(),
            booked_at,
        };
        let slot = Slot {
            booked: true,
            booked_by: Some(BookedBy {
                name: customer.name,
                phone: customer.phone,
                note: customer.note,
                booked_at,
            }),
            ..self.clone()
        };
        (slot, booking)
    }
}

/// Append-only record of a successful booking. Keeps the slot's date and time
/// so it stays readable after the slot is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub date: String,
    pub time: String,
    pub name: String,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub booked_at: DateTime<Utc>,
}
