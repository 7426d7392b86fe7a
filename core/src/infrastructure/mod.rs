//! Infrastructure backing the domain: persistence

pub mod database;
