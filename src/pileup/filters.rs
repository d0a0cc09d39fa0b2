//! Derived views of a pileup.
//!
//! Per-sample pileups are filtered sample by sample and re-assembled, so a
//! filter never moves an element across samples. Filters that cannot remove
//! anything hand back the receiver itself.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use super::fragments::OverlapResolver;
use super::tracker::sample_key;
use super::{ElementTracker, PerSampleTracker, Pileup, PileupElement, SampleKey, UnifiedTracker};
use crate::genomics::AlignedRead;

/// Quality threshold that lets every element through.
pub const NO_MINIMUM: i32 = -1;

fn lane_matches(read: &AlignedRead, lane: &str, prefix: &str) -> bool {
    read.read_group_id()
        .is_some_and(|id| id == lane || id.starts_with(prefix))
}

impl Pileup {
    /// Rebuild the pileup with `transform` applied to each list of elements,
    /// keeping the receiver's shape.
    fn map_elements<F>(&self, transform: F) -> Pileup
    where
        F: Fn(&UnifiedTracker) -> UnifiedTracker,
    {
        let tracker = match &self.tracker {
            ElementTracker::Unified(elements) => ElementTracker::Unified(transform(elements)),
            ElementTracker::PerSample(tracker) => {
                let mut filtered = PerSampleTracker::new();
                for (sample, elements) in tracker.iter_samples() {
                    filtered.add_elements(sample.clone(), transform(elements));
                }
                ElementTracker::PerSample(filtered)
            }
        };
        Pileup::from_tracker(self.locus.clone(), tracker)
    }

    fn retain_elements<P>(&self, keep: P) -> Pileup
    where
        P: Fn(&PileupElement) -> bool,
    {
        self.map_elements(|elements| elements.iter().filter(|e| keep(e)).cloned().collect())
    }

    fn retain_non_empty<P>(&self, keep: P) -> Option<Pileup>
    where
        P: Fn(&PileupElement) -> bool,
    {
        let filtered = self.retain_elements(keep);
        (!filtered.is_empty()).then_some(filtered)
    }

    /// Pileup without deletion elements.
    pub fn without_deletions(&self) -> Cow<'_, Pileup> {
        if self.n_deletions == 0 {
            return Cow::Borrowed(self);
        }
        Cow::Owned(self.retain_elements(|e| !e.is_deletion()))
    }

    /// Pileup without reads of mapping quality zero.
    pub fn without_mapping_quality_zero_reads(&self) -> Cow<'_, Pileup> {
        if self.n_mq0 == 0 {
            return Cow::Borrowed(self);
        }
        Cow::Owned(self.retain_elements(|e| e.mapping_qual() > 0))
    }

    /// Keep one read of each overlapping pair, dropping pairs that disagree
    /// on the base and keeping the higher base quality otherwise.
    pub fn overlapping_fragment_filtered_default(&self) -> Pileup {
        self.overlapping_fragment_filtered(true, true)
    }

    /// Keep one read of each overlapping pair.
    ///
    /// With `discard_discordant`, pairs disagreeing on the base are dropped.
    /// Otherwise the mate with the higher base quality (or mapping quality
    /// when `base_qual_not_map_qual` is false) is kept.
    pub fn overlapping_fragment_filtered(
        &self,
        discard_discordant: bool,
        base_qual_not_map_qual: bool,
    ) -> Pileup {
        let resolver = OverlapResolver::new(discard_discordant, base_qual_not_map_qual);
        self.map_elements(|elements| resolver.resolve(elements.as_slice()).into())
    }

    /// Elements accepted by `predicate`.
    pub fn filtered<P>(&self, predicate: P) -> Pileup
    where
        P: Fn(&PileupElement) -> bool,
    {
        self.retain_elements(predicate)
    }

    /// Elements with base quality >= `min_base_q` from reads with mapping
    /// quality >= `min_map_q`. Deletions carry no base call and only face the
    /// mapping threshold. Negative thresholds disable a check.
    pub fn base_and_mapping_filtered(&self, min_base_q: i32, min_map_q: i32) -> Pileup {
        self.retain_elements(|e| {
            i32::from(e.mapping_qual()) >= min_map_q
                && (e.is_deletion() || i32::from(e.qual()) >= min_base_q)
        })
    }

    /// Elements with base quality >= `min_base_q`.
    pub fn base_filtered(&self, min_base_q: i32) -> Pileup {
        self.base_and_mapping_filtered(min_base_q, NO_MINIMUM)
    }

    /// Elements from reads with mapping quality >= `min_map_q`.
    pub fn mapping_filtered(&self, min_map_q: i32) -> Pileup {
        self.base_and_mapping_filtered(NO_MINIMUM, min_map_q)
    }

    /// Elements from forward-strand reads.
    pub fn positive_strand(&self) -> Pileup {
        self.retain_elements(|e| !e.read().is_reverse)
    }

    /// Elements from reverse-strand reads.
    pub fn negative_strand(&self) -> Pileup {
        self.retain_elements(|e| e.read().is_reverse)
    }

    /// Elements from read group `read_group`; `None` selects reads without a
    /// read group identifier. Returns `None` when nothing matches.
    pub fn for_read_group(&self, read_group: Option<&str>) -> Option<Pileup> {
        self.retain_non_empty(|e| e.read().read_group_id() == read_group)
    }

    /// Elements from any of `read_groups`; an absent or empty set selects
    /// reads without a read group identifier. Returns `None` when nothing
    /// matches.
    pub fn for_read_groups(&self, read_groups: Option<&HashSet<String>>) -> Option<Pileup> {
        match read_groups.filter(|set| !set.is_empty()) {
            Some(set) => self.retain_non_empty(|e| {
                e.read()
                    .read_group_id()
                    .is_some_and(|id| set.contains(id))
            }),
            None => self.for_read_group(None),
        }
    }

    /// Elements from lane `lane`: read groups named exactly `lane` or
    /// `lane.<sample>`. `None` selects reads without a read group identifier.
    pub fn for_lane(&self, lane: Option<&str>) -> Option<Pileup> {
        match lane {
            Some(lane) => {
                let prefix = format!("{lane}.");
                self.retain_non_empty(|e| lane_matches(e.read(), lane, &prefix))
            }
            None => self.for_read_group(None),
        }
    }

    /// Elements from `sample`; `None` selects reads without a sample.
    /// Returns `None` when nothing matches.
    pub fn for_sample(&self, sample: Option<&str>) -> Option<Pileup> {
        match &self.tracker {
            ElementTracker::PerSample(tracker) => tracker
                .elements_for(sample)
                .map(|elements| Pileup::from_tracker(self.locus.clone(), elements.clone())),
            ElementTracker::Unified(_) => self.retain_non_empty(|e| e.read().sample() == sample),
        }
    }

    /// Elements from any of `samples` (`None` entries select reads without a
    /// sample). Returns `None` when nothing matches.
    pub fn for_samples<'s, I>(&self, samples: I) -> Option<Pileup>
    where
        I: IntoIterator<Item = Option<&'s str>>,
    {
        match &self.tracker {
            ElementTracker::PerSample(tracker) => tracker
                .elements_for_samples(samples)
                .map(|selected| Pileup::from_tracker(self.locus.clone(), selected)),
            ElementTracker::Unified(_) => {
                let wanted: HashSet<Option<&str>> = samples.into_iter().collect();
                self.retain_non_empty(|e| wanted.contains(&e.read().sample()))
            }
        }
    }

    /// One pileup per requested sample.
    ///
    /// Flat pileups yield an entry (possibly empty) for every requested
    /// sample; per-sample pileups only for samples they hold.
    pub fn pileups_for_samples<'s, I>(&self, samples: I) -> BTreeMap<SampleKey, Pileup>
    where
        I: IntoIterator<Item = Option<&'s str>>,
    {
        match &self.tracker {
            ElementTracker::PerSample(tracker) => samples
                .into_iter()
                .filter_map(|sample| {
                    tracker.elements_for(sample).map(|elements| {
                        let pileup = Pileup::from_tracker(self.locus.clone(), elements.clone());
                        (sample_key(sample), pileup)
                    })
                })
                .collect(),
            ElementTracker::Unified(elements) => {
                let mut partitions: BTreeMap<SampleKey, UnifiedTracker> = samples
                    .into_iter()
                    .map(|sample| (sample_key(sample), UnifiedTracker::new()))
                    .collect();
                for element in elements {
                    if let Some(partition) = partitions.get_mut(&sample_key(element.read().sample())) {
                        partition.push(element.clone());
                    }
                }
                partitions
                    .into_iter()
                    .map(|(sample, elements)| (sample, Pileup::from_tracker(self.locus.clone(), elements)))
                    .collect()
            }
        }
    }

    /// Flat pileup ordered by alignment start, then read name.
    pub fn start_sorted(&self) -> Pileup {
        let mut elements: Vec<PileupElement> = match &self.tracker {
            ElementTracker::Unified(tracker) => tracker.iter().cloned().collect(),
            ElementTracker::PerSample(tracker) => tracker.iter().cloned().collect(),
        };
        elements.sort_by(|a, b| {
            a.read()
                .alignment_start()
                .cmp(&b.read().alignment_start())
                .then_with(|| a.read().name().cmp(b.read().name()))
        });
        Pileup::from_tracker(self.locus.clone(), UnifiedTracker::from(elements))
    }
}
