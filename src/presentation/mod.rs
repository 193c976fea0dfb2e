// Presentation layer - JSON API for the browser shell
pub mod app_state;
pub mod error;
pub mod handlers;
pub mod router;
