//! Identity matching across lineages.
//!
//! # Responsibility
//! - Normalize personal names for comparison.
//! - Propose likely duplicate persons between two lineages.
//!
//! # See also
//! - merge: consumes confirmed proposals as person mappings.

pub mod matcher;
pub mod normalize;
