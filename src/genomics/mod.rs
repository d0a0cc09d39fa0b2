//! Genomic primitives consumed by pileups.
//!
//! This module exposes the read and coordinate types piled up by
//! [`crate::pileup`], plus BAM input.

pub mod io;
mod types;

pub use types::{AlignedRead, CigarOp, CigarOpKind, Locus, ReadGroup};
