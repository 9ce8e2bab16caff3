pub mod backing;
pub mod common;
pub mod config;
pub mod ctrl;
pub mod port;
pub mod replace;
pub mod respbuf;
pub mod sim;
pub mod store;
pub mod trace;
pub mod tracker;

#[cfg(feature = "stat")]
pub mod stat;
