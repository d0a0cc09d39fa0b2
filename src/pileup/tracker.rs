//! Containers holding the elements of a pileup.
//!
//! A pileup either keeps its elements in one ordered list
//! ([`ElementTracker::Unified`]) or partitions them by sample
//! ([`ElementTracker::PerSample`]). The shape is chosen when the pileup is
//! built and never changes afterwards.

use std::collections::BTreeMap;
use std::iter::Flatten;
use std::slice;
use std::sync::Arc;

use super::PileupElement;

/// Sample a per-sample partition belongs to; `None` collects reads without a
/// sample.
pub type SampleKey = Option<Arc<str>>;

pub(crate) fn sample_key(sample: Option<&str>) -> SampleKey {
    sample.map(Arc::from)
}

/// Ordered list of elements.
#[derive(Debug, Clone, Default)]
pub struct UnifiedTracker {
    elements: Vec<PileupElement>,
}

impl UnifiedTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element.
    pub fn push(&mut self, element: PileupElement) {
        self.elements.push(element);
    }

    /// Element at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&PileupElement> {
        self.elements.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the tracker holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate elements in order.
    pub fn iter(&self) -> slice::Iter<'_, PileupElement> {
        self.elements.iter()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[PileupElement] {
        &self.elements
    }

    fn append(&mut self, other: UnifiedTracker) {
        self.elements.extend(other.elements);
    }
}

impl From<Vec<PileupElement>> for UnifiedTracker {
    fn from(elements: Vec<PileupElement>) -> Self {
        Self { elements }
    }
}

impl FromIterator<PileupElement> for UnifiedTracker {
    fn from_iter<I: IntoIterator<Item = PileupElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a UnifiedTracker {
    type Item = &'a PileupElement;
    type IntoIter = slice::Iter<'a, PileupElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Elements partitioned by sample, iterated in sample order.
#[derive(Debug, Clone, Default)]
pub struct PerSampleTracker {
    samples: BTreeMap<SampleKey, UnifiedTracker>,
    size: usize,
}

impl PerSampleTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Known sample keys, in iteration order.
    pub fn samples(&self) -> impl Iterator<Item = &SampleKey> + '_ {
        self.samples.keys()
    }

    /// Number of samples with at least one element.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Elements of one sample.
    pub fn elements_for(&self, sample: Option<&str>) -> Option<&UnifiedTracker> {
        self.samples.get(&sample_key(sample))
    }

    /// Per-sample tracker restricted to `samples`, or `None` when none of them
    /// is present.
    pub fn elements_for_samples<'s, I>(&self, samples: I) -> Option<PerSampleTracker>
    where
        I: IntoIterator<Item = Option<&'s str>>,
    {
        let mut selected = PerSampleTracker::new();
        for sample in samples {
            let key = sample_key(sample);
            if selected.samples.contains_key(&key) {
                continue;
            }
            if let Some(elements) = self.samples.get(&key) {
                selected.add_elements(key, elements.clone());
            }
        }
        (selected.sample_count() > 0).then_some(selected)
    }

    /// Add elements for `sample`, appending to any it already has.
    ///
    /// Empty trackers are ignored so that no sample maps to an empty list.
    pub fn add_elements(&mut self, sample: SampleKey, elements: impl Into<UnifiedTracker>) {
        let elements = elements.into();
        if elements.is_empty() {
            return;
        }
        self.size += elements.len();
        self.samples.entry(sample).or_default().append(elements);
    }

    /// Total number of elements across samples.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether no sample has elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// `(sample, elements)` pairs in sample order.
    pub fn iter_samples(&self) -> impl Iterator<Item = (&SampleKey, &UnifiedTracker)> + '_ {
        self.samples.iter()
    }

    /// Iterate all elements, sample by sample.
    pub fn iter(&self) -> Flatten<std::collections::btree_map::Values<'_, SampleKey, UnifiedTracker>> {
        self.samples.values().flatten()
    }
}

/// Element container of a pileup.
#[derive(Debug, Clone)]
pub enum ElementTracker {
    /// One ordered list.
    Unified(UnifiedTracker),
    /// Lists keyed by sample.
    PerSample(PerSampleTracker),
}

impl Default for ElementTracker {
    fn default() -> Self {
        ElementTracker::Unified(UnifiedTracker::new())
    }
}

impl ElementTracker {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ElementTracker::Unified(tracker) => tracker.len(),
            ElementTracker::PerSample(tracker) => tracker.len(),
        }
    }

    /// Whether the tracker holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate elements; per-sample trackers yield samples in key order.
    pub fn iter(&self) -> Iter<'_> {
        match self {
            ElementTracker::Unified(tracker) => Iter::Unified(tracker.iter()),
            ElementTracker::PerSample(tracker) => Iter::PerSample(tracker.iter()),
        }
    }

    /// Element at a position of the iteration order.
    pub fn get(&self, index: usize) -> Option<&PileupElement> {
        match self {
            ElementTracker::Unified(tracker) => tracker.get(index),
            ElementTracker::PerSample(tracker) => tracker.iter().nth(index),
        }
    }

    /// Whether the elements are partitioned by sample.
    pub fn is_per_sample(&self) -> bool {
        matches!(self, ElementTracker::PerSample(_))
    }

    /// Flatten into a single ordered list.
    pub fn into_unified(self) -> UnifiedTracker {
        match self {
            ElementTracker::Unified(tracker) => tracker,
            ElementTracker::PerSample(tracker) => {
                tracker.samples.into_values().flat_map(|t| t.elements).collect()
            }
        }
    }
}

impl From<UnifiedTracker> for ElementTracker {
    fn from(tracker: UnifiedTracker) -> Self {
        ElementTracker::Unified(tracker)
    }
}

impl From<PerSampleTracker> for ElementTracker {
    fn from(tracker: PerSampleTracker) -> Self {
        ElementTracker::PerSample(tracker)
    }
}

impl From<ElementTracker> for UnifiedTracker {
    fn from(tracker: ElementTracker) -> Self {
        tracker.into_unified()
    }
}

impl<'a> IntoIterator for &'a ElementTracker {
    type Item = &'a PileupElement;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of an [`ElementTracker`].
#[derive(Debug, Clone)]
pub enum Iter<'a> {
    #[doc(hidden)]
    Unified(slice::Iter<'a, PileupElement>),
    #[doc(hidden)]
    PerSample(Flatten<std::collections::btree_map::Values<'a, SampleKey, UnifiedTracker>>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PileupElement;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Unified(iter) => iter.next(),
            Iter::PerSample(iter) => iter.next(),
        }
    }
}
