//! Endpoint catalog discovery and invocation.
//!
//! Route definitions and interface signatures live on the remote filesystem,
//! so discovery is a series of channel round trips: find the route files,
//! fetch each one, extract route blocks, fetch the declaring interface, parse
//! the method signature. Invocation reconstructs HTTP requests as curl argv
//! executed through the same channel.

pub mod auth;
pub mod catalog;
pub mod invoke;
pub mod routes;
pub mod signature;
