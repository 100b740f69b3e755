//! Transport abstractions (Telegram today; other messengers could fit the same port).

pub mod port;
pub mod types;
