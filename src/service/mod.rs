pub mod chain_query;
pub mod formatter;
pub mod gateway_service;
pub mod wallet_service;
