// =============================================================================
// Bitget Exchange Integration
// =============================================================================
//
// Public REST market data for USDT-margined perpetuals.
// =============================================================================

pub mod client;

pub use client::BitgetClient;
