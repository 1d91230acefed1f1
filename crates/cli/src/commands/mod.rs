pub mod ask;
pub mod chat;
pub mod knowledge;
pub mod status;
