pub mod client;
pub mod gridx;
pub mod heartbeat;
