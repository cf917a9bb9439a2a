//! Generation provider adapters.
//!
//! - `http_provider` - the external image-generation API over HTTPS
//! - `mock_provider` - scripted responses for tests

mod http_provider;
mod mock_provider;

pub use http_provider::{HttpGenerationProvider, HttpProviderConfig, CALLBACK_PATH};
pub use mock_provider::MockGenerationProvider;
