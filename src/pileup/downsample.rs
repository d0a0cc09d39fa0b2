use std::borrow::Cow;

use bitvec::prelude::*;
use rand::Rng;
use tracing::debug;

use super::{ElementTracker, PerSampleTracker, Pileup, UnifiedTracker};

/// Source of uniformly distributed indices.
pub trait RandomSource {
    /// Uniform draw from `0..upper`; `upper` is never zero.
    fn next_index(&mut self, upper: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_index(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }
}

/// Choose `desired` distinct positions out of `0..size`.
///
/// Draws are repeated until enough distinct positions have been seen, so the
/// selection is uniform without replacement. Asking for at least `size`
/// positions selects everything.
pub fn select_positions<R>(size: usize, desired: usize, rng: &mut R) -> BitVec
where
    R: RandomSource + ?Sized,
{
    let mut selected = bitvec![0; size];
    if desired >= size {
        selected.fill(true);
        return selected;
    }

    let mut chosen = 0;
    let mut draws = 0usize;
    while chosen < desired {
        let position = rng.next_index(size);
        draws += 1;
        if !selected[position] {
            selected.set(position, true);
            chosen += 1;
        }
    }
    debug!(size, desired, draws, "selected downsampling positions");
    selected
}

fn keep_selected<'a>(
    elements: impl Iterator<Item = &'a super::PileupElement>,
    selected: &BitSlice,
) -> UnifiedTracker {
    elements
        .zip(selected.iter().by_vals())
        .filter_map(|(element, keep)| keep.then(|| element.clone()))
        .collect()
}

impl Pileup {
    /// Random subset of exactly `desired_coverage` elements, in their original
    /// order. Pileups no larger than that are returned as is.
    ///
    /// Per-sample pileups draw positions over the whole pileup in iteration
    /// order, so samples keep their share of the selection.
    pub fn downsampled<R>(&self, desired_coverage: usize, rng: &mut R) -> Cow<'_, Pileup>
    where
        R: RandomSource + ?Sized,
    {
        if self.tracker.len() <= desired_coverage {
            return Cow::Borrowed(self);
        }

        let selected = select_positions(self.tracker.len(), desired_coverage, rng);
        let tracker = match &self.tracker {
            ElementTracker::Unified(elements) => {
                ElementTracker::Unified(keep_selected(elements.iter(), &selected))
            }
            ElementTracker::PerSample(tracker) => {
                let mut downsampled = PerSampleTracker::new();
                let mut start = 0;
                for (sample, elements) in tracker.iter_samples() {
                    let end = start + elements.len();
                    downsampled.add_elements(
                        sample.clone(),
                        keep_selected(elements.iter(), &selected[start..end]),
                    );
                    start = end;
                }
                ElementTracker::PerSample(downsampled)
            }
        };
        Cow::Owned(Pileup::from_tracker(self.locus.clone(), tracker))
    }
}
