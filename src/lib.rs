pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod upstream;

pub use error::{AdapterError, Result};
pub use session::SessionStore;
pub use upstream::ClientHandle;
