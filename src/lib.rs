pub mod auth;
pub mod config;
pub mod domain;
pub mod mail;
pub mod prompt;

pub use mail::clean::clean;
pub use mail::decoders::decode_header_value;
