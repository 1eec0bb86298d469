// Adapters layer: concrete fetchers and displays behind the domain ports.

pub mod display;
pub mod http;

pub use display::{FileDisplay, MemoryDisplay};
pub use http::HttpFetcher;
