pub mod deliveries;
pub mod event;

pub use deliveries::*;
pub use event::*;
