//! The event pipeline: field derivation, typed event schemas, context
//! enrichment, and normalization into the outbound payload shape.
//!
//! Every stage here is pure. An inbound body is validated once, enriched
//! once, normalized once, and the result is handed to the delivery port.

pub mod derive;
pub mod enrich;
pub mod normalize;
pub mod schemas;
