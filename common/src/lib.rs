pub mod config;
pub mod error;
pub mod mocap;
pub mod network;
