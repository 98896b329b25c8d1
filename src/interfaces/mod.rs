//! Outer adapters: the CSV command script and the balance report.

pub mod csv;
