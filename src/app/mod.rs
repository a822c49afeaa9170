mod event_handler;
mod intake;
pub mod notification;
mod pipeline;
mod state;
pub mod view_model;

pub use event_handler::{handle_event, refresh_view};
pub use intake::offer_file;
pub use state::{AppEvent, AppState};
