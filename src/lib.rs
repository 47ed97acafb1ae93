pub mod board;
pub mod config;
pub mod edge;
pub mod error;
pub mod export;
pub mod feed;
pub mod grade;
pub mod http_cache;
pub mod http_client;
pub mod lines_upload;
pub mod merge;
pub mod rank;
pub mod roster_fetch;
pub mod state;
