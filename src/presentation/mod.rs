// Presentation layer - HTTP surface over the dashboard service
pub mod api_error;
pub mod app_state;
pub mod handlers;
