//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Server-side Ports
//!
//! - `SessionValidator` - Bearer token validation
//! - `CreditLedger` - Per-user credit balance in the identity provider's profile store
//! - `GenerationProvider` - Asynchronous image-generation service
//! - `TaskStore` - Webhook payloads keyed by task id
//!
//! ## Client-side Ports
//!
//! - `TaskStatusSource` - The status endpoint as seen by a polling client

mod credit_ledger;
mod generation_provider;
mod session_validator;
mod task_status_source;
mod task_store;

pub use credit_ledger::{CreditLedger, LedgerError};
pub use generation_provider::{DispatchReceipt, GenerationProvider, ProviderError};
pub use session_validator::SessionValidator;
pub use task_status_source::{PollTransportError, TaskStatusSource};
pub use task_store::{TaskStore, TaskStoreError};
