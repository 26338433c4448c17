//! Seagull
//!
//! Safe wrappers over Windows platform services:
//!
//! - [`registry`]: scoped registry keys, typed values, enumeration, deletion
//! - [`oleutils`]: CLSID text formatting

pub mod oleutils;
pub mod registry;
