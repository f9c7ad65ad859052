//! Request handlers, one module per resource.

pub mod dose;
pub mod medication;
pub mod user;
pub mod webhook;
