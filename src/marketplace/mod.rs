//! Marketplace domain: actors, bookings and the in-memory store.

mod booking;
mod store;

pub use booking::{Booking, BookingError, BookingStatus, CancelledBy};
pub use store::{
    ActorStats, CustomerRecord, GlobalModelRecord, MarketStore, ProviderRecord,
};
