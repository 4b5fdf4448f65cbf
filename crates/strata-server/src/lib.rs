//! HTTP front end for the strata customer registry.
//!
//! The `strata` binary serves customer CRUD under `/customers` and development-only cache
//! diagnostics under `/cache`.

pub mod gateway;
