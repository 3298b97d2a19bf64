//! File input and output.
//!
//! - [`glob`] - resolve an input argument to one or more CSV files
//! - [`csv`] - sharded CSV reading and spill files

pub mod csv;
pub mod glob;
