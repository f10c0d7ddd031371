//! # Domain Layer
//!
//! Core entities and repository traits. The relational store is an
//! external collaborator; everything the realtime core needs from it goes
//! through the async traits defined alongside each entity.

pub mod entities;

pub use entities::*;
