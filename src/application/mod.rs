// Application layer - dashboard composition engine and use cases
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod drag_drop;
pub mod layout_store;
pub mod preference_manager;
pub mod refresh_service;
pub mod widget_manager;
pub mod widget_registry;
