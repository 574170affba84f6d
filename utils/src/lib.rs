pub mod config;
pub mod xlogging;
