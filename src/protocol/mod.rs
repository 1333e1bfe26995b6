//! # Protocol Routing
//!
//! Glue between the codec layers: envelope decode, typed sub-packet
//! selection, and publication on the event bus.

pub mod dispatcher;
