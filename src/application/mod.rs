// Application layer - Use cases and the traits collaborators implement
pub mod codec;
pub mod dashboard_service;
pub mod layout_reconciler;
pub mod market_provider;
pub mod state_repository;
pub mod store;
pub mod widget_feed_service;
