//! Core types for the storefront offline caching runtime.
//!
//! This crate provides the fundamental types shared by every runtime crate:
//! - `RequestDescriptor` - An intercepted request
//! - `CapturedResponse` - A fully buffered response
//! - `RoutingClass` - Request classification result
//! - `RuntimeConfig` - Immutable runtime configuration
//! - `AssetManifest` - Build-time list of static assets
//! - `LifecycleState` - Install/activate state machine

mod config;
mod error;
mod lifecycle;
mod manifest;
mod request;
mod response;
mod routing;

pub use config::*;
pub use error::*;
pub use lifecycle::*;
pub use manifest::*;
pub use request::*;
pub use response::*;
pub use routing::*;
