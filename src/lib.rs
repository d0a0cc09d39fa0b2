//! # Read-backed pileups
//!
//! This library models the pileup of aligned sequencing reads at a single
//! genomic coordinate: every read's observed base and quality at that
//! coordinate, optionally partitioned by sample.
//!
//! ## Core model
//!
//! 1. **Elements**: one read bound to one offset, with indel/clip adjacency
//! 2. **Trackers**: elements held flat or per sample
//! 3. **Pileups**: a locus, a tracker and cached counters
//! 4. **Views**: filters, overlap resolution, downsampling and sorting, each
//!    returning a new pileup
//!
//! ## Usage Example
//!
//! ```ignore
//! use readpile::{Locus, Pileup, PileupConfig};
//!
//! let config = PileupConfig::default().with_min_base_quality(20).with_seed(7);
//! let pileup = Pileup::from_alignments(Locus::new("chr1", 99), &reads);
//! let filtered = config.apply(&pileup, &mut config.rng())?;
//! println!("{}", filtered.pileup_string(b'A'));
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;   // Filter chain configuration
pub mod genomics; // Reads, loci and BAM input
pub mod pileup;   // Pileup data model

// Re-exports for convenience
pub use config::PileupConfig;
pub use genomics::{AlignedRead, CigarOp, CigarOpKind, Locus, ReadGroup};
pub use pileup::{ElementTracker, Pileup, PileupElement, RandomSource, SampleKey};

use thiserror::Error;

/// Result type alias for pileup operations.
pub type Result<T> = std::result::Result<T, PileupError>;

/// Errors raised when a pileup or its configuration is built from invalid
/// input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PileupError {
    /// A required argument was absent or violated a precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PileupError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PileupError::InvalidArgument(msg.into())
    }
}
