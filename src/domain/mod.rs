// Domain layer - Plain data, no I/O
pub mod dashboard;
pub mod market;
pub mod settings;
pub mod widget;
