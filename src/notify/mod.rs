pub mod format;
pub mod router;
pub mod sink;

pub use router::{DeliveryReport, NotificationRouter};
pub use sink::{NotificationSink, SendError};
