//! Pinpoll - multi-account polling client for a reward-task service
//!
//! Each account (bearer token + proxy) gets its own proxied HTTP session and an
//! independent loop that reports profile status and claims offered tasks.

pub mod credentials;
pub mod error;
pub mod identity;
pub mod journal;
pub mod polling;
pub mod remote;
pub mod schedule;
pub mod session;
pub mod supervisor;

pub use error::{PinpollError, Result};
