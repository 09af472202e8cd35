//! # Qualisys Core
//!
//! The QTM real-time client and the `qualisys` extension built on it.

pub mod error;
pub mod extension;
pub mod mocap;
pub mod network;
pub mod qtm;
pub mod supervisor;

pub use error::ConnectionError;
pub use extension::{EXTENSION_NAME, QualisysMocapExtension, register};
pub use qtm::{FrameStream, QtmConnection};
pub use supervisor::{SupervisorOptions, supervise};
