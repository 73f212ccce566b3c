use crate::error::SlotError;
use crate::types::{Booking, Slot, SlotKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{error, info};

/// On-disk image of the slot collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotDocument {
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

pub enum Change<'a> {
    Added(&'a Slot),
    Deleted(&'a SlotKey),
    Booked(&'a Slot, &'a Booking),
}

impl SlotDocument {
    fn apply(&mut self, change: &Change<'_>) {
        match change {
            Change::Added(slot) => {
                self.slots.push((*slot).clone());
                self.slots.sort_by_key(Slot::key);
            }
            Change::Deleted(key) => {
                self.slots.retain(|slot| slot.date != key.date || slot.time != key.time);
            }
            Change::Booked(booked, booking) => {
                if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == booked.id) {
                    *slot = (*booked).clone();
                }
                self.bookings.push((*booking).clone());
            }
        }
    }
}

/// JSON file holding a [`SlotDocument`]. A change is reported as committed only
/// after the new document has been fsynced and renamed over the old one.
#[derive(Debug)]
pub struct SlotFile {
    path: PathBuf,
    document: Mutex<SlotDocument>,
}

impl SlotFile {
    /// Loads `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SlotError> {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => SlotDocument::default(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Data file does not exist yet, starting empty");
                SlotDocument::default()
            }
            Err(err) => return Err(err.into()),
        };

        let mut keys = BTreeSet::new();
        for slot in &document.slots {
            if !keys.insert(slot.key()) {
                return Err(SlotError::StorageUnavailable(format!(
                    "duplicate slot {} {} in {}",
                    slot.date,
                    slot.time,
                    path.display()
                )));
            }
        }

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn document(&self) -> Result<SlotDocument, SlotError> {
        Ok(self.document.lock()?.clone())
    }

    /// Holds the writer lock, stalling every commit until the guard drops.
    #[cfg(test)]
    pub fn hold(&self) -> std::sync::MutexGuard<'_, SlotDocument> {
        self.document.lock().unwrap()
    }

    pub fn commit(&self, change: Change<'_>) -> Result<(), SlotError> {
        let mut document = self.document.lock()?;
        let mut next = document.clone();
        next.apply(&change);

        if let Err(err) = self.write(&next) {
            error!(?err, path = %self.path.display(), "Failed to write data file");
            return Err(err);
        }
        *document = next;
        Ok(())
    }

    fn write(&self, document: &SlotDocument) -> Result<(), SlotError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(directory)?;
        serde_json::to_writer_pretty(&mut file, document)?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::Customer;
    use chrono::Utc;
    use tempfile::tempdir;

    fn slot(date: &str, time: &str) -> Slot {
        Slot::new(SlotKey::new(date, time).unwrap())
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let file = SlotFile::open(dir.path().join("slots.json")).unwrap();
        assert_eq!(file.document().unwrap(), SlotDocument::default());
    }

    #[test]
    fn test_commit_writes_sorted_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");
        let file = SlotFile::open(&path).unwrap();

        let later = slot("2024-06-01", "11:00");
        let earlier = slot("2024-06-01", "10:00");
        file.commit(Change::Added(&later)).unwrap();
        file.commit(Change::Added(&earlier)).unwrap();

        let on_disk: SlotDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.slots, vec![earlier, later]);
        assert_eq!(on_disk, file.document().unwrap());
    }

    #[test]
    fn test_booked_change_replaces_slot_and_appends_booking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");
        let file = SlotFile::open(&path).unwrap();
        let free = slot("2024-06-01", "10:00");
        file.commit(Change::Added(&free)).unwrap();

        let customer = Customer::new("Alice", None, None).unwrap();
        let (booked, booking) = free.with_booking(customer, Utc::now());
        file.commit(Change::Booked(&booked, &booking)).unwrap();

        let reopened = SlotFile::open(&path).unwrap().document().unwrap();
        assert_eq!(reopened.slots, vec![booked]);
        assert_eq!(reopened.bookings, vec![booking]);
    }

    #[test]
    fn test_deleted_change_removes_slot() {
        let dir = tempdir().unwrap();
        let file = SlotFile::open(dir.path().join("slots.json")).unwrap();
        let first = slot("2024-06-01", "10:00");
        let second = slot("2024-06-01", "11:00");
        file.commit(Change::Added(&first)).unwrap();
        file.commit(Change::Added(&second)).unwrap();

        file.commit(Change::Deleted(&first.key())).unwrap();

        assert_eq!(file.document().unwrap().slots, vec![second]);
    }

    #[test]
    fn test_duplicate_keys_are_rejected_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");
        let document = SlotDocument {
            slots: vec![slot("2024-06-01", "10:00"), slot("2024-06-01", "10:00")],
            bookings: vec![],
        };
        fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

        let err = SlotFile::open(&path).unwrap_err();
        assert!(matches!(err, SlotError::StorageUnavailable(_)));
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir).unwrap();
        let file = SlotFile::open(data_dir.join("slots.json")).unwrap();
        let kept = slot("2024-06-01", "10:00");
        file.commit(Change::Added(&kept)).unwrap();

        fs::remove_dir_all(&data_dir).unwrap();
        let lost = slot("2024-06-01", "11:00");
        let err = file.commit(Change::Added(&lost)).unwrap_err();

        assert!(matches!(err, SlotError::StorageUnavailable(_)));
        assert_eq!(file.document().unwrap().slots, vec![kept]);
    }
}
