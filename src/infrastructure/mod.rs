// Infrastructure layer - configuration, persistence adapters and logging
pub mod config;
pub mod logging;
pub mod memory_repository;
pub mod remote_repository;
