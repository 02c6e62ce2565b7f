pub mod config;
pub mod logging;

pub mod chunker;
pub mod endpoint;
pub mod extract;
pub mod filter;
pub mod har;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod verify;

mod text;
