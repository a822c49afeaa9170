pub mod history;
pub mod toast;
pub mod voice_cards;
pub mod window;
