//! Collection of general utility functions shared across the service.

pub mod jwt;
pub mod password;
pub mod random;
