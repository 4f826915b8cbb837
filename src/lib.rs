pub mod account;
pub mod api;
pub mod clients;
pub mod config;
pub mod invoice;
pub mod payments;
pub mod shared;
