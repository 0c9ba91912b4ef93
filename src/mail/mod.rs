pub mod clean;
pub mod decoders;
pub mod extract;
pub mod imap_client;
pub mod search;
pub mod smtp_client;
