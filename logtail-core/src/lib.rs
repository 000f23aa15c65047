pub mod backend;
pub mod config;
pub mod error;
pub mod host;
pub mod launch;
pub mod reducer;
pub mod sse;
pub mod state;
pub mod suggest;
