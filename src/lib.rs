pub mod collector;
pub mod db;
pub mod notifications;
pub mod payments;
pub mod server;
pub mod services;
pub mod version;
pub mod web;
