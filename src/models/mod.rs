//! # Models
//!
//! Model implementations for adverse-event safety data. The hierarchical
//! mixture model estimates incidence differences and odds ratios per AE,
//! borrowing strength across preferred terms within a system organ class.

pub mod hierarchy;
