//! Outbound interface adapters for Loreagent.
//!
//! Each interface delivers agent replies to one surface. Interfaces are
//! trait-based and platform-agnostic.
//!
//! Available interfaces:
//! - **Terminal** — prints to stdout for interactive use
//! - **Api** — collects replies for a programmatic caller
//! - **Telegram** — Telegram Bot API (sendMessage / sendPhoto)
//! - **Registry** — central interface manager with the outbound queue

pub mod api;
pub mod registry;
pub mod telegram;
pub mod terminal;

pub use api::{ApiInterface, ApiReply};
pub use registry::{InterfaceRegistry, OutboundMessage};
pub use telegram::{TelegramConfig, TelegramInterface};
pub use terminal::TerminalInterface;
