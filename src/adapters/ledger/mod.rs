//! Credit ledger adapters.
//!
//! - `in_memory` - process-local balances for development and tests
//! - `profile_store` - balances held in the identity provider's user metadata

mod in_memory;
mod profile_store;

pub use in_memory::InMemoryCreditLedger;
pub use profile_store::{ProfileStoreConfig, ProfileStoreCreditLedger};
