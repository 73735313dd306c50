pub mod fetch;
pub mod sources;
pub mod transport;

// Re-export what the role crate wires together
pub use fetch::{fetch_all, FetchError, RawSourceBundle};
pub use sources::FeedEndpoints;
pub use transport::{FeedError, FeedTransport, HttpTransport};
