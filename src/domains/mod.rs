//! Domains module containing business logic organized by bounded contexts.

pub mod clients;
pub mod prompts;
pub mod tools;
