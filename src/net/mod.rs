pub mod admission;
pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;
