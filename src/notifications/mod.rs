pub mod senders;
pub mod service;
pub mod templates;
