pub mod address;
pub mod chain_value;
pub mod errors;
pub mod mnemonic;
pub mod records;

pub use errors::{GatewayError, GatewayResult, WalletFailure};
