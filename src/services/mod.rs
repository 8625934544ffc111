pub mod advisor_api;
pub mod balance_service;
pub mod cache;
pub mod chain_client;
pub mod history_service;
pub mod history_store;
pub mod price_service;
