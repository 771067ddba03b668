//! HTTP handlers, grouped by domain: health probes and the streaming
//! surface. There's no JSON API beyond that — this is a broadcaster core,
//! not a content management backend.

pub mod health;
pub mod stream;
