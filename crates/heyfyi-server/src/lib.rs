//! Runtime pieces of the hey.fyi server binary: configuration, outbound
//! mail, the vote replenishment job and admin bootstrapping.

pub mod admin;
pub mod config;
pub mod mail;
pub mod replenish;

pub use admin::{AdminBootstrap, ensure_admin};
pub use config::{ServerConfig, SmtpConfig};
pub use mail::{MailError, ServerMailer};
