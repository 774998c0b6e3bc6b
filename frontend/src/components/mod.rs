pub mod chat;
pub mod news;
