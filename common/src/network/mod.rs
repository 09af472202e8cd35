pub mod registry;
pub mod url;

pub use registry::{
    ConnectionEntry, ConnectionPurpose, ConnectionRegistration, ConnectionRegistry,
    ConnectionState,
};
pub use url::{ConnectionUrl, DEFAULT_CONNECTION_URL, DEFAULT_QTM_PORT};
