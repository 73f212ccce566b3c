use crate::error::SlotError;
use crate::types::{Booking, Customer, Slot, SlotKey};

/// Storage of bookable slots. Implementations guarantee that `(date, time)` is
/// unique and that at most one `book_slot` call succeeds per slot, no matter
/// how many callers race for it.
pub trait SlotBackend: Clone + Send + Sync + 'static {
    /// All slots, or those on `date`, ordered by `(date, time)`.
    fn slots(&self, date: Option<&str>) -> Result<Vec<Slot>, SlotError>;
    fn add_slot(&self, key: SlotKey) -> Result<Slot, SlotError>;
    fn delete_slot(&self, key: &SlotKey) -> Result<Slot, SlotError>;
    fn book_slot(&self, key: &SlotKey, customer: Customer) -> Result<Slot, SlotError>;
    /// Booking audit trail ordered by booking time.
    fn bookings(&self) -> Result<Vec<Booking>, SlotError>;
}
