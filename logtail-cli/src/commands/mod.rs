mod files;
mod hosts;
mod tail;

pub use files::run_files;
pub use hosts::run_hosts;
pub use tail::run_tail;
