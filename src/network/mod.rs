pub mod client;
pub mod codec;
pub mod connection;
pub mod history;

pub use client::{ReconnectPolicy, socket_endpoint};
pub use connection::Connection;
pub use history::{HistorySource, HttpHistory};
