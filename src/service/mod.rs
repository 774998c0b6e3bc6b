pub mod auth_email;
pub mod change_feed;
pub mod news_service;
pub mod normalize;
pub mod server_stats;
