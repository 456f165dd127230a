// Infrastructure layer - External dependencies and adapters
pub mod alpha_vantage;
pub mod config;
pub mod custom_endpoint;
pub mod feed_stream;
pub mod file_repository;
pub mod finnhub;
pub mod http_response;
pub mod memory_repository;
pub mod mock_provider;
pub mod providers;
