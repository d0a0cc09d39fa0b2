//! Filter chain applied to pileups before they are reported.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::pileup::{Pileup, RandomSource, NO_MINIMUM};
use crate::{PileupError, Result};

/// Highest Phred value a quality threshold can meaningfully take.
const MAX_QUALITY: i32 = u8::MAX as i32;

/// Configuration of the standard pileup filter chain.
///
/// Filters run in a fixed order: mapping-quality-zero reads, quality
/// thresholds, deletions, overlapping mates, then downsampling.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PileupConfig {
    /// Minimum base quality; negative disables the check.
    pub min_base_quality: i32,
    /// Minimum mapping quality; negative disables the check.
    pub min_mapping_quality: i32,
    /// Drop reads with mapping quality zero.
    pub drop_mapping_quality_zero: bool,
    /// Drop deletion elements.
    pub drop_deletions: bool,
    /// Keep one read per overlapping pair.
    pub resolve_overlaps: bool,
    /// Drop overlapping mates that disagree on the base.
    pub discard_discordant: bool,
    /// Resolve overlaps by base quality rather than mapping quality.
    pub overlap_by_base_quality: bool,
    /// Downsample to at most this many elements.
    pub downsample_to: Option<usize>,
    /// Seed for downsampling; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Partition pileups by sample.
    pub by_sample: bool,
}

impl Default for PileupConfig {
    fn default() -> Self {
        Self {
            min_base_quality: NO_MINIMUM,
            min_mapping_quality: NO_MINIMUM,
            drop_mapping_quality_zero: true,
            drop_deletions: false,
            resolve_overlaps: true,
            discard_discordant: true,
            overlap_by_base_quality: true,
            downsample_to: None,
            seed: None,
            by_sample: false,
        }
    }
}

impl PileupConfig {
    /// Set the minimum base quality.
    pub fn with_min_base_quality(mut self, min_base_quality: i32) -> Self {
        self.min_base_quality = min_base_quality;
        self
    }

    /// Set the minimum mapping quality.
    pub fn with_min_mapping_quality(mut self, min_mapping_quality: i32) -> Self {
        self.min_mapping_quality = min_mapping_quality;
        self
    }

    /// Enable or disable dropping deletion elements.
    pub fn with_drop_deletions(mut self, enabled: bool) -> Self {
        self.drop_deletions = enabled;
        self
    }

    /// Enable or disable overlapping-mate resolution.
    pub fn with_overlap_resolution(mut self, enabled: bool) -> Self {
        self.resolve_overlaps = enabled;
        self
    }

    /// Downsample to `coverage` elements.
    pub fn with_downsampling(mut self, coverage: usize) -> Self {
        self.downsample_to = Some(coverage);
        self
    }

    /// Seed the downsampling random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable per-sample partitioning.
    pub fn with_by_sample(mut self, enabled: bool) -> Self {
        self.by_sample = enabled;
        self
    }

    /// Check that the settings describe a usable filter chain.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_base_quality", self.min_base_quality),
            ("min_mapping_quality", self.min_mapping_quality),
        ] {
            if value > MAX_QUALITY {
                return Err(PileupError::InvalidArgument(format!(
                    "{name} {value} exceeds the maximum quality {MAX_QUALITY}"
                )));
            }
        }
        if self.downsample_to == Some(0) {
            return Err(PileupError::invalid("downsampling target must be > 0"));
        }
        Ok(())
    }

    /// Random source for downsampling, seeded when a seed is configured.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Run the filter chain over `pileup`.
    pub fn apply<R>(&self, pileup: &Pileup, rng: &mut R) -> Result<Pileup>
    where
        R: RandomSource + ?Sized,
    {
        self.validate()?;

        let mut current = if self.drop_mapping_quality_zero {
            pileup.without_mapping_quality_zero_reads().into_owned()
        } else {
            pileup.clone()
        };

        if self.min_base_quality >= 0 || self.min_mapping_quality >= 0 {
            current = current.base_and_mapping_filtered(self.min_base_quality, self.min_mapping_quality);
        }
        if self.drop_deletions {
            current = current.without_deletions().into_owned();
        }
        if self.resolve_overlaps {
            current = current.overlapping_fragment_filtered(
                self.discard_discordant,
                self.overlap_by_base_quality,
            );
        }
        if let Some(coverage) = self.downsample_to {
            current = current.downsampled(coverage, rng).into_owned();
        }

        debug!(
            locus = %pileup.location(),
            before = pileup.len(),
            after = current.len(),
            "applied pileup filters"
        );
        Ok(current)
    }
}
