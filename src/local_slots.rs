use crate::{
    backend::SlotBackend,
    error::SlotError,
    slot_file::{Change, SlotFile},
    types::{Booking, Customer, Slot, SlotKey},
};
use chrono::Utc;
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

/// A slot's own lock. `None` once the slot has been deleted or its add failed,
/// so a caller that looked the cell up earlier observes `NotFound`.
type SlotCell = Arc<Mutex<Option<Slot>>>;

/// In-process slot store, optionally journaled to a JSON file.
///
/// The index is held only to look up, insert or remove cells and never while
/// waiting on a cell or the journal. Every read-decide-write runs under the
/// slot's own cell, so journal writes for one slot never hold up another.
/// Lock order is cell, then index or journal, then bookings.
#[derive(Debug, Clone, Default)]
pub struct LocalSlots {
    slots: Arc<Mutex<BTreeMap<SlotKey, SlotCell>>>,
    bookings: Arc<Mutex<Vec<Booking>>>,
    journal: Option<Arc<SlotFile>>,
}

impl LocalSlots {
    /// Loads the store from `path` and writes every later change back to it.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, SlotError> {
        let journal = SlotFile::open(path)?;
        let document = journal.document()?;
        let slots = document
            .slots
            .into_iter()
            .map(|slot| (slot.key(), Arc::new(Mutex::new(Some(slot)))))
            .collect();

        Ok(Self {
            slots: Arc::new(Mutex::new(slots)),
            bookings: Arc::new(Mutex::new(document.bookings)),
            journal: Some(Arc::new(journal)),
        })
    }

    fn cell(&self, key: &SlotKey) -> Result<Option<SlotCell>, SlotError> {
        Ok(self.slots.lock()?.get(key).cloned())
    }

    /// Drops `cell` from the index unless the key already points elsewhere.
    fn forget(&self, key: &SlotKey, cell: &SlotCell) -> Result<(), SlotError> {
        let mut slots = self.slots.lock()?;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
            slots.remove(key);
        }
        Ok(())
    }

    fn commit(&self, change: Change<'_>) -> Result<(), SlotError> {
        match &self.journal {
            Some(journal) => journal.commit(change),
            None => Ok(()),
        }
    }

    fn book_cell(
        &self,
        key: &SlotKey,
        cell: &SlotCell,
        customer: Customer,
    ) -> Result<Slot, SlotError> {
        let mut entry = cell.lock()?;
        let Some(slot) = entry.as_ref() else {
            warn!(date = %key.date, time = %key.time, "Slot was deleted before booking");
            return Err(SlotError::NotFound);
        };
        if slot.booked {
            warn!(date = %key.date, time = %key.time, "Slot was already booked");
            return Err(SlotError::AlreadyBooked);
        }

        let (booked, booking) = slot.with_booking(customer, Utc::now());
        self.commit(Change::Booked(&booked, &booking))?;
        *entry = Some(booked.clone());
        self.bookings.lock()?.push(booking);

        info!(date = %key.date, time = %key.time, "Slot booked");
        Ok(booked)
    }
}

impl SlotBackend for LocalSlots {
    fn slots(&self, date: Option<&str>) -> Result<Vec<Slot>, SlotError> {
        let cells: Vec<SlotCell> = self
            .slots
            .lock()?
            .iter()
            .filter(|(key, _)| date.map_or(true, |date| key.date == date))
            .map(|(_, cell)| cell.clone())
            .collect();

        let mut slots = Vec::with_capacity(cells.len());
        for cell in cells {
            if let Some(slot) = cell.lock()?.clone() {
                slots.push(slot);
            }
        }
        Ok(slots)
    }

    fn add_slot(&self, key: SlotKey) -> Result<Slot, SlotError> {
        // Published already locked, so others wait for the journal outcome.
        let cell: SlotCell = Arc::new(Mutex::new(None));
        let mut entry = cell.lock()?;

        loop {
            let existing = {
                let mut slots = self.slots.lock()?;
                match slots.get(&key).cloned() {
                    Some(existing) => existing,
                    None => {
                        slots.insert(key.clone(), cell.clone());
                        break;
                    }
                }
            };
            if existing.lock()?.is_some() {
                warn!(date = %key.date, time = %key.time, "Slot already exists");
                return Err(SlotError::AlreadyExists);
            }

            // Left behind by a delete or a failed add.
            let mut slots = self.slots.lock()?;
            if slots
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &existing))
            {
                slots.insert(key.clone(), cell.clone());
                break;
            }
        }

        let slot = Slot::new(key.clone());
        if let Err(err) = self.commit(Change::Added(&slot)) {
            self.forget(&key, &cell)?;
            return Err(err);
        }
        *entry = Some(slot.clone());

        info!(date = %slot.date, time = %slot.time, "Slot added");
        Ok(slot)
    }

    fn delete_slot(&self, key: &SlotKey) -> Result<Slot, SlotError> {
        let Some(cell) = self.cell(key)? else {
            warn!(date = %key.date, time = %key.time, "Slot to delete does not exist");
            return Err(SlotError::NotFound);
        };
        let mut entry = cell.lock()?;
        let Some(slot) = entry.clone() else {
            warn!(date = %key.date, time = %key.time, "Slot to delete does not exist");
            return Err(SlotError::NotFound);
        };

        self.commit(Change::Deleted(key))?;
        *entry = None;
        self.forget(key, &cell)?;

        info!(date = %key.date, time = %key.time, "Slot deleted");
        Ok(slot)
    }

    fn book_slot(&self, key: &SlotKey, customer: Customer) -> Result<Slot, SlotError> {
        let Some(cell) = self.cell(key)? else {
            warn!(date = %key.date, time = %key.time, "Slot to book does not exist");
            return Err(SlotError::NotFound);
        };
        self.book_cell(key, &cell, customer)
    }

    fn bookings(&self) -> Result<Vec<Booking>, SlotError> {
        let mut bookings = self.bookings.lock()?.clone();
        bookings.sort_by_key(|booking| booking.booked_at);
        Ok(bookings)
    }
}
