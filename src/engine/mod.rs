pub mod adapter;
pub mod config;
pub mod external;
pub mod readers;
