//! Read-backed pileups.
//!
//! A [`Pileup`] binds a [`Locus`] to every read observation overlapping it.
//! Pileups are immutable: filters and transforms build a new pileup over the
//! same shared reads and leave the receiver untouched. Elements are kept
//! either in one ordered list or partitioned by sample; every operation works
//! on both shapes and per-sample pileups are filtered sample by sample.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::genomics::{AlignedRead, Locus};
use crate::{PileupError, Result};

mod collect;
mod downsample;
mod element;
mod filters;
mod format;
mod fragments;
mod tracker;

pub use collect::{element_at, PileupWalker};
pub use downsample::{select_positions, RandomSource};
pub use element::{ElementFlags, NextEvent, PileupElement, DELETION_BASE, DELETION_QUAL};
pub use filters::NO_MINIMUM;
pub use format::quals_to_string;
pub use fragments::OverlapResolver;
pub use tracker::{ElementTracker, Iter, PerSampleTracker, SampleKey, UnifiedTracker};

const NUM_BASES: usize = 4; // A, C, G, T

/// Per-base observation counts `[A, C, G, T]`.
pub type BaseCounts = [usize; NUM_BASES];

pub(crate) fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// Cached counters derived from a set of elements.
#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    size: usize,
    n_deletions: usize,
    n_mq0: usize,
}

impl Counts {
    fn of<'a>(elements: impl IntoIterator<Item = &'a PileupElement>) -> Self {
        let mut counts = Counts::default();
        for element in elements {
            counts.size += 1;
            if element.is_deletion() {
                counts.n_deletions += 1;
            }
            if element.mapping_qual() == 0 {
                counts.n_mq0 += 1;
            }
        }
        counts
    }
}

/// All reads observed at one locus.
#[derive(Debug, Clone)]
pub struct Pileup {
    locus: Locus,
    tracker: ElementTracker,
    size: usize,
    depth: OnceLock<usize>,
    n_deletions: usize,
    n_mq0: usize,
}

impl Pileup {
    fn with_counts(locus: Locus, tracker: ElementTracker, counts: Counts) -> Self {
        Self {
            locus,
            tracker,
            size: counts.size,
            depth: OnceLock::new(),
            n_deletions: counts.n_deletions,
            n_mq0: counts.n_mq0,
        }
    }

    /// Pileup over an existing tracker; counters are computed eagerly.
    pub fn from_tracker(locus: Locus, tracker: impl Into<ElementTracker>) -> Self {
        let tracker = tracker.into();
        let counts = Counts::of(&tracker);
        let pileup = Self::with_counts(locus, tracker, counts);
        trace!(
            locus = %pileup.locus,
            size = pileup.size,
            per_sample = pileup.tracker.is_per_sample(),
            "built pileup"
        );
        pileup
    }

    /// Pileup without any reads.
    pub fn empty(locus: Locus) -> Self {
        Self::with_counts(locus, ElementTracker::default(), Counts::default())
    }

    /// Pile up `reads[i]` at `offsets[i]`.
    ///
    /// Elements carry no indel or clipping context.
    pub fn from_reads_with_offsets(
        locus: Locus,
        reads: Option<&[Arc<AlignedRead>]>,
        offsets: Option<&[usize]>,
    ) -> Result<Self> {
        let reads = reads.ok_or_else(|| PileupError::invalid("read list is absent"))?;
        let offsets = offsets.ok_or_else(|| PileupError::invalid("offset list is absent"))?;
        if reads.len() != offsets.len() {
            return Err(PileupError::InvalidArgument(format!(
                "reads and offsets have different lengths ({} != {})",
                reads.len(),
                offsets.len()
            )));
        }

        let tracker: UnifiedTracker = reads
            .iter()
            .zip(offsets)
            .map(|(read, &offset)| PileupElement::simple(Arc::clone(read), offset))
            .collect();
        Ok(Self::from_tracker(locus, tracker))
    }

    /// Pile up every read at the same `offset`.
    pub fn from_reads_at_offset(
        locus: Locus,
        reads: Option<&[Arc<AlignedRead>]>,
        offset: i64,
    ) -> Result<Self> {
        let reads = reads.ok_or_else(|| PileupError::invalid("read list is absent"))?;
        let offset = usize::try_from(offset)
            .map_err(|_| PileupError::InvalidArgument(format!("offset {offset} is negative")))?;

        let tracker: UnifiedTracker = reads
            .iter()
            .map(|read| PileupElement::simple(Arc::clone(read), offset))
            .collect();
        Ok(Self::from_tracker(locus, tracker))
    }

    /// Pileup over an ordered list of elements.
    pub fn from_elements(locus: Option<Locus>, elements: Option<Vec<PileupElement>>) -> Result<Self> {
        let locus = locus.ok_or_else(|| PileupError::invalid("locus is absent"))?;
        let elements = elements.ok_or_else(|| PileupError::invalid("element list is absent"))?;
        Ok(Self::from_tracker(locus, UnifiedTracker::from(elements)))
    }

    /// Pileup over `elements` with counters supplied by the caller.
    ///
    /// The counters are trusted and not checked against the elements.
    pub fn from_elements_with_counts(
        locus: Locus,
        elements: Vec<PileupElement>,
        size: usize,
        n_deletions: usize,
        n_mq0: usize,
    ) -> Self {
        let counts = Counts {
            size,
            n_deletions,
            n_mq0,
        };
        Self::with_counts(locus, UnifiedTracker::from(elements).into(), counts)
    }

    /// Per-sample pileup assembled from one pileup per sample.
    pub fn from_samples<I>(locus: Locus, pileups: I) -> Self
    where
        I: IntoIterator<Item = (SampleKey, Pileup)>,
    {
        let mut tracker = PerSampleTracker::new();
        let mut counts = Counts::default();
        let mut depth = 0;
        for (sample, pileup) in pileups {
            counts.size += pileup.len();
            counts.n_deletions += pileup.deletion_count();
            counts.n_mq0 += pileup.mapping_quality_zero_count();
            depth += pileup.depth_of_coverage();
            tracker.add_elements(sample, pileup.tracker);
        }

        let pileup = Self::with_counts(locus, tracker.into(), counts);
        let _ = pileup.depth.set(depth);
        pileup
    }

    /// Locus the pileup is anchored to.
    pub fn location(&self) -> &Locus {
        &self.locus
    }

    /// Element container.
    pub fn tracker(&self) -> &ElementTracker {
        &self.tracker
    }

    /// Iterate elements; per-sample pileups yield samples in key order.
    pub fn iter(&self) -> Iter<'_> {
        self.tracker.iter()
    }

    /// Number of physical elements.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the pileup holds no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of observations, counting each reduced-read element by the
    /// observations it represents. Computed on first use.
    pub fn depth_of_coverage(&self) -> usize {
        *self
            .depth
            .get_or_init(|| self.tracker.iter().map(PileupElement::representative_count).sum())
    }

    /// Number of deletion elements.
    pub fn deletion_count(&self) -> usize {
        self.n_deletions
    }

    /// Number of elements whose read has mapping quality zero.
    pub fn mapping_quality_zero_count(&self) -> usize {
        self.n_mq0
    }

    /// Counts of A, C, G and T among non-deletion elements.
    pub fn base_counts(&self) -> BaseCounts {
        match &self.tracker {
            ElementTracker::Unified(tracker) => count_bases(tracker),
            ElementTracker::PerSample(tracker) => {
                tracker
                    .iter_samples()
                    .map(|(_, elements)| count_bases(elements))
                    .fold([0; NUM_BASES], |mut total, counts| {
                        for (sum, count) in total.iter_mut().zip(counts) {
                            *sum += count;
                        }
                        total
                    })
            }
        }
    }

    /// Distinct read group identifiers; `None` stands for reads without one.
    pub fn read_groups(&self) -> BTreeSet<Option<Arc<str>>> {
        self.iter()
            .map(|element| element.read().read_group.as_ref().and_then(|rg| rg.id.clone()))
            .collect()
    }

    /// Distinct samples; `None` stands for reads without a sample.
    pub fn samples(&self) -> BTreeSet<SampleKey> {
        match &self.tracker {
            ElementTracker::PerSample(tracker) => tracker.samples().cloned().collect(),
            ElementTracker::Unified(tracker) => tracker
                .iter()
                .map(|element| element.read().read_group.as_ref().and_then(|rg| rg.sample.clone()))
                .collect(),
        }
    }

    /// Reads in element order.
    pub fn reads(&self) -> Vec<Arc<AlignedRead>> {
        self.iter().map(|element| Arc::clone(element.read())).collect()
    }

    /// Read offsets in element order.
    pub fn offsets(&self) -> Vec<usize> {
        self.iter().map(PileupElement::offset).collect()
    }

    /// Called bases in element order.
    pub fn bases(&self) -> Vec<u8> {
        self.iter().map(PileupElement::base).collect()
    }

    /// Base qualities in element order.
    pub fn quals(&self) -> Vec<u8> {
        self.iter().map(PileupElement::qual).collect()
    }

    /// Mapping qualities in element order.
    pub fn mapping_quals(&self) -> Vec<u8> {
        self.iter().map(PileupElement::mapping_qual).collect()
    }

    /// Number of elements immediately followed by a deletion.
    pub fn deletions_after_count(&self) -> usize {
        self.iter().filter(|e| e.is_before_deletion_start()).count()
    }

    /// Number of elements immediately followed by an insertion.
    pub fn insertions_after_count(&self) -> usize {
        self.iter().filter(|e| e.is_before_insertion()).count()
    }

    /// Independent copy whose element lists share nothing with `self`.
    pub fn copy(&self) -> Pileup {
        self.clone()
    }

    /// Whether `self` and `other` are the same object.
    pub fn ptr_eq(&self, other: &Pileup) -> bool {
        std::ptr::eq(self, other)
    }
}

impl<'a> IntoIterator for &'a Pileup {
    type Item = &'a PileupElement;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn count_bases(elements: &UnifiedTracker) -> BaseCounts {
    let mut counts = [0; NUM_BASES];
    for element in elements.iter().filter(|e| !e.is_deletion()) {
        if let Some(idx) = base_index(element.base()) {
            counts[idx] += 1;
        }
    }
    counts
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::genomics::{AlignedRead, CigarOp, CigarOpKind, Locus, ReadGroup};

    use super::{ElementFlags, PileupElement, SampleKey};

    pub fn key(sample: &str) -> SampleKey {
        Some(Arc::from(sample))
    }

    pub fn locus() -> Locus {
        Locus::new("chr1", 99)
    }

    pub fn read(name: &str, start: u32, base: u8, qual: u8, mapq: u8) -> Arc<AlignedRead> {
        Arc::new(AlignedRead::new(
            name,
            "chr1",
            start,
            mapq,
            vec![CigarOp::new(CigarOpKind::Match, 1)],
            vec![base],
            vec![qual],
        ))
    }

    pub fn grouped_read(name: &str, rg: &Arc<ReadGroup>, base: u8, reverse: bool) -> Arc<AlignedRead> {
        Arc::new(
            AlignedRead::new(name, "chr1", 99, 60, Vec::new(), vec![base], vec![30])
                .with_read_group(Arc::clone(rg))
                .with_reverse_strand(reverse),
        )
    }

    pub fn element(name: &str, base: u8, qual: u8, mapq: u8) -> PileupElement {
        PileupElement::simple(read(name, 99, base, qual, mapq), 0)
    }

    pub fn deletion(name: &str, mapq: u8) -> PileupElement {
        PileupElement::new(read(name, 99, b'A', 30, mapq), 0, ElementFlags::deletion())
    }
}
