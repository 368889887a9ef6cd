pub mod batch;
pub mod clock;
pub mod item;
pub mod message;

pub use batch::ContentBatch;
pub use clock::{Clock, FixedClock, SystemClock};
pub use item::ContentItem;
pub use message::FormattedMessage;
