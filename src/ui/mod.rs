pub mod app;
pub mod components;
pub mod room_chat;
pub mod state;
pub mod status;

pub use app::ChatApp;
