//! HTTP handlers for the sign-in service.

pub mod metrics;
pub mod signin;

pub use signin::*;
