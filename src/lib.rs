//! Download, persist and reload the resources of an account: policies, groups,
//! users, service users and boundaries.

pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod reference;
pub mod sanitize;
pub mod types;

pub use client::{AccountClient, HttpAccountClient};
pub use config::{Config, FeatureFlags};
pub use downloader::{AccountInfo, Downloader};
pub use error::{AccountError, Result};
pub use persistence::{load, write, WriterContext};
pub use reference::Ref;
pub use sanitize::sanitize;
pub use types::Resources;
