use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    backend::SlotBackend,
    configuration::Configuration,
    error::SlotError,
    types::{Booking, Customer, Slot, SlotKey},
};
use chrono::Utc;

pub struct MockSlotBackendInner {
    pub failure: Mutex<Option<SlotError>>,
    pub calls_to_slots: AtomicU64,
    pub calls_to_add_slot: AtomicU64,
    pub calls_to_delete_slot: AtomicU64,
    pub calls_to_book_slot: AtomicU64,
    pub calls_to_bookings: AtomicU64,
    pub date_filters: Mutex<Vec<Option<String>>>,
    pub slots: Mutex<Vec<Slot>>,
}

/// Records calls and answers with canned data, or with `failure` when one is set.
#[derive(Clone)]
pub struct MockSlotBackend(pub Arc<MockSlotBackendInner>);

impl MockSlotBackendInner {
    fn new() -> Self {
        Self {
            failure: Mutex::default(),
            calls_to_slots: AtomicU64::default(),
            calls_to_add_slot: AtomicU64::default(),
            calls_to_delete_slot: AtomicU64::default(),
            calls_to_book_slot: AtomicU64::default(),
            calls_to_bookings: AtomicU64::default(),
            date_filters: Mutex::default(),
            slots: Mutex::default(),
        }
    }
}

impl MockSlotBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockSlotBackendInner::new()))
    }

    pub fn fail_with(&self, failure: SlotError) {
        *self.0.failure.lock().unwrap() = Some(failure);
    }

    pub fn calls(&self, operation: &str) -> u64 {
        let counter = match operation {
            "slots" => &self.0.calls_to_slots,
            "add_slot" => &self.0.calls_to_add_slot,
            "delete_slot" => &self.0.calls_to_delete_slot,
            "book_slot" => &self.0.calls_to_book_slot,
            "bookings" => &self.0.calls_to_bookings,
            _ => unimplemented!(),
        };
        counter.load(Ordering::SeqCst)
    }

    fn result(&self) -> Result<(), SlotError> {
        match self.0.failure.lock().unwrap().clone() {
            None => Ok(()),
            Some(failure) => Err(failure),
        }
    }
}

impl SlotBackend for MockSlotBackend {
    fn slots(&self, date: Option<&str>) -> Result<Vec<Slot>, SlotError> {
        self.0.calls_to_slots.fetch_add(1, Ordering::SeqCst);
        self.0
            .date_filters
            .lock()
            .unwrap()
            .push(date.map(String::from));
        self.result()?;
        Ok(self.0.slots.lock().unwrap().clone())
    }

    fn add_slot(&self, key: SlotKey) -> Result<Slot, SlotError> {
        self.0.calls_to_add_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Slot::new(key))
    }

    fn delete_slot(&self, key: &SlotKey) -> Result<Slot, SlotError> {
        self.0.calls_to_delete_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Slot::new(key.clone()))
    }

    fn book_slot(&self, key: &SlotKey, customer: Customer) -> Result<Slot, SlotError> {
        self.0.calls_to_book_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        let (booked, _) = Slot::new(key.clone()).with_booking(customer, Utc::now());
        Ok(booked)
    }

    fn bookings(&self) -> Result<Vec<Booking>, SlotError> {
        self.0.calls_to_bookings.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(vec![])
    }
}

#[derive(Clone, Default)]
pub struct TestConfiguration {
    pub public_dir: Option<PathBuf>,
}

impl Configuration for TestConfiguration {
    fn port(&self) -> u16 {
        0
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn database_pool_size(&self) -> u32 {
        1
    }

    fn data_file(&self) -> Option<PathBuf> {
        None
    }

    fn public_dir(&self) -> Option<PathBuf> {
        self.public_dir.clone()
    }
}
