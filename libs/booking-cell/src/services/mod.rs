pub mod cart;
pub mod conflict;
pub mod slot;
pub mod sources;

pub use cart::CartService;
pub use conflict::SlotConflictChecker;
pub use slot::{HourMarker, TimeSpec};
pub use sources::{BookingConflictSource, CartBookingSource, OrderTestSource};
