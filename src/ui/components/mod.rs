pub mod chat_area;
pub mod debug_panel;
pub mod emoji_bar;
pub mod input_bar;
pub mod reply_banner;
pub mod sidebar;
