pub mod connection;
pub mod gateway;
pub mod mutation;
pub mod session;
pub mod store;
pub mod token;
