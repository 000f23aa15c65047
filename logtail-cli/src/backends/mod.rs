//! Backend implementations

pub mod fake;
pub mod http;

pub use fake::FakeBackend;
pub use http::HttpBackend;
