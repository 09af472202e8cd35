pub mod channel;
pub mod tcp;

pub use channel::MessageChannel;
