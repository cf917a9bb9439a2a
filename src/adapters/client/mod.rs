//! Client-side adapters used by the task poller.

mod http_status_source;

pub use http_status_source::HttpTaskStatusSource;
