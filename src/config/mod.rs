//! # Configuration
//!
//! Connection profile for XSOAR/XSIAM servers and the environment lookup
//! used to resolve it.
//!
//! Values passed explicitly always win over environment variables. Nothing
//! here performs network I/O: a built [`ClientConfig`] is only guaranteed to
//! be internally consistent, not reachable.

mod client;
mod environment;
mod tls;

pub use crate::error::ConfigurationError;
pub use client::{ClientConfig, ClientOptions, ServerVersion};
pub use environment::{resolve_setting, Environment, ProcessEnvironment};
pub use tls::VerifySsl;
