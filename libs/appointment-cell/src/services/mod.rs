pub mod availability;
pub mod calendar;
pub mod conflict;
pub mod lifecycle;
pub mod memory;
pub mod scheduling;
pub mod store;
pub mod supabase_store;

pub use availability::{AvailabilityEngine, OpenSlots};
pub use conflict::ConflictChecker;
pub use lifecycle::AppointmentLifecycleService;
pub use memory::InMemoryStore;
pub use scheduling::SchedulingService;
pub use store::{BoundedStore, SchedulingStore};
pub use supabase_store::SupabaseStore;
