mod event;
mod status;
mod theme;

pub use event::*;
pub use status::*;
pub use theme::*;
