pub mod birthdays;
pub mod clock;
pub mod search;

pub use clock::{Clock, FixedClock, SystemClock};
