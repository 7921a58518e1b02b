//! # Model Layer
//!
//! Persistence for chat messages and the identity counter.

pub mod store;
