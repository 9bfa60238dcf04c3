//! Business logic behind the REST handlers.

pub mod token_service;
