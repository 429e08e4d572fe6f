pub mod cache;
pub mod factory;
pub mod repositories;
