//! Gateway services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own upstream lookup, forwarding and health probing so
//! route handlers can stay focused on request extraction and status mapping.

pub mod health;
pub mod proxy;
pub mod registry;
