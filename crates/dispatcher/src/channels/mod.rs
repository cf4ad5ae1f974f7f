//! Channel implementations
//!
//! Contains TelegramChannel, EmailChannel, and LogChannel.

mod email;
mod log;
mod telegram;

pub use self::email::EmailChannel;
pub use self::log::LogChannel;
pub use self::telegram::TelegramChannel;
