//! Infrastructure for the GMA client: the reqwest-backed transport and
//! configuration file storage.

pub mod config_storage;
pub mod paths;
pub mod reqwest_transport;

pub use config_storage::{ConfigStorage, apply_env_overrides};
pub use paths::GmaPaths;
pub use reqwest_transport::ReqwestTransport;
