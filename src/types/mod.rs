//! Data types shared across the relay.
//!
//! ## Organization
//!
//! - [`quote`] — The normalized [`Quote`] and the raw upstream payload
//! - [`symbols`] — The ordered [`SymbolSet`] the scheduler walks
//! - [`protocol`] — Control messages exchanged on the push channel

pub mod protocol;
pub mod quote;
pub mod symbols;

pub use quote::Quote;
pub use symbols::SymbolSet;
