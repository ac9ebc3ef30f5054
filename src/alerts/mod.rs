pub mod cache;
pub mod detector;
pub mod reminders;

pub use cache::SnapshotCache;
pub use detector::detect_goals;
pub use reminders::ReminderBook;
