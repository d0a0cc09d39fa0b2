//! Building pileups from aligned reads.
//!
//! Reads are walked along their CIGAR so that elements know whether they sit
//! inside a deletion or next to an indel or soft clip.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use super::{ElementFlags, NextEvent, Pileup, PileupElement, SampleKey, UnifiedTracker};
use crate::genomics::{AlignedRead, CigarOp, CigarOpKind, Locus};

fn kind_at(cigar: &[CigarOp], index: Option<usize>) -> Option<CigarOpKind> {
    index.and_then(|i| cigar.get(i)).map(|op| op.kind)
}

/// Element for `read` at the 0-based reference `position`, or `None` when
/// the read does not cover it.
pub fn element_at(read: &Arc<AlignedRead>, position: u32) -> Option<PileupElement> {
    if position < read.pos {
        return None;
    }
    if read.cigar.is_empty() {
        let offset = (position - read.pos) as usize;
        return (offset < read.len()).then(|| PileupElement::simple(Arc::clone(read), offset));
    }

    let cigar = read.cigar.as_slice();
    let mut ref_pos = read.pos;
    let mut read_pos = 0usize;

    for (idx, op) in cigar.iter().enumerate() {
        let prev = kind_at(cigar, idx.checked_sub(1));
        let next = kind_at(cigar, Some(idx + 1));

        match op.kind {
            CigarOpKind::Match => {
                if position < ref_pos + op.len {
                    let within = position - ref_pos;
                    let first = within == 0;
                    let last = within + 1 == op.len;
                    let flags = ElementFlags {
                        is_deletion: false,
                        before_deletion: last && next == Some(CigarOpKind::Deletion),
                        after_deletion: first && prev == Some(CigarOpKind::Deletion),
                        before_insertion: last && next == Some(CigarOpKind::Insertion),
                        after_insertion: first && prev == Some(CigarOpKind::Insertion),
                        next_to_soft_clip: (first && prev == Some(CigarOpKind::SoftClip))
                            || (last && next == Some(CigarOpKind::SoftClip)),
                    };
                    let offset = read_pos + within as usize;
                    let element = PileupElement::new(Arc::clone(read), offset, flags);
                    return Some(match next_event(read, cigar, idx + 1, offset + 1, last) {
                        Some(event) => element.with_next_event(event),
                        None => element,
                    });
                }
                ref_pos += op.len;
                read_pos += op.len as usize;
            }
            CigarOpKind::Deletion => {
                if position < ref_pos + op.len {
                    let offset = read_pos.saturating_sub(1);
                    return Some(PileupElement::new(
                        Arc::clone(read),
                        offset,
                        ElementFlags::deletion(),
                    ));
                }
                ref_pos += op.len;
            }
            CigarOpKind::RefSkip => {
                if position < ref_pos + op.len {
                    return None;
                }
                ref_pos += op.len;
            }
            CigarOpKind::Insertion | CigarOpKind::SoftClip => read_pos += op.len as usize,
            CigarOpKind::HardClip => {}
        }
    }
    None
}

fn next_event(
    read: &AlignedRead,
    cigar: &[CigarOp],
    next_idx: usize,
    next_offset: usize,
    last: bool,
) -> Option<NextEvent> {
    if !last {
        return None;
    }
    let op = cigar.get(next_idx)?;
    match op.kind {
        CigarOpKind::Deletion => Some(NextEvent {
            bases: None,
            length: op.len,
        }),
        CigarOpKind::Insertion => {
            let end = (next_offset + op.len as usize).min(read.len());
            let bases = read.sequence.get(next_offset.min(end)..end).unwrap_or_default();
            Some(NextEvent {
                bases: Some(Arc::from(bases)),
                length: op.len,
            })
        }
        _ => None,
    }
}

impl Pileup {
    /// Flat pileup of every read covering `locus`, in read order.
    pub fn from_alignments(locus: Locus, reads: &[Arc<AlignedRead>]) -> Pileup {
        let tracker: UnifiedTracker = reads
            .iter()
            .filter(|read| *read.chrom == *locus.contig)
            .filter_map(|read| element_at(read, locus.position))
            .collect();
        Pileup::from_tracker(locus, tracker)
    }

    /// Per-sample pileup of every read covering `locus`, keyed by the sample
    /// of each read's read group.
    pub fn from_alignments_by_sample(locus: Locus, reads: &[Arc<AlignedRead>]) -> Pileup {
        let mut by_sample: BTreeMap<SampleKey, UnifiedTracker> = BTreeMap::new();
        for read in reads.iter().filter(|read| *read.chrom == *locus.contig) {
            if let Some(element) = element_at(read, locus.position) {
                let sample = read.read_group.as_ref().and_then(|rg| rg.sample.clone());
                by_sample.entry(sample).or_default().push(element);
            }
        }

        let children: Vec<(SampleKey, Pileup)> = by_sample
            .into_iter()
            .map(|(sample, elements)| (sample, Pileup::from_tracker(locus.clone(), elements)))
            .collect();
        Pileup::from_samples(locus, children)
    }
}

/// Walks a window of one contig, yielding a pileup for every covered
/// position.
#[derive(Debug)]
pub struct PileupWalker {
    contig: Arc<str>,
    reads: Vec<Arc<AlignedRead>>,
    next_read: usize,
    active: Vec<Arc<AlignedRead>>,
    position: u32,
    end: u32,
    by_sample: bool,
}

impl PileupWalker {
    /// Walker over `window` of `contig`. Reads on other contigs are ignored.
    pub fn new(contig: impl Into<Arc<str>>, window: Range<u32>, reads: &[Arc<AlignedRead>]) -> Self {
        let contig = contig.into();
        let mut reads: Vec<Arc<AlignedRead>> = reads
            .iter()
            .filter(|read| *read.chrom == *contig && read.end() > window.start && read.pos < window.end)
            .cloned()
            .collect();
        reads.sort_by_key(|read| read.pos);
        debug!(
            contig = %contig,
            start = window.start,
            end = window.end,
            reads = reads.len(),
            "walking pileup window"
        );

        Self {
            contig,
            reads,
            next_read: 0,
            active: Vec::new(),
            position: window.start,
            end: window.end,
            by_sample: false,
        }
    }

    /// Partition each pileup by sample.
    pub fn by_sample(mut self, enabled: bool) -> Self {
        self.by_sample = enabled;
        self
    }
}

impl Iterator for PileupWalker {
    type Item = Pileup;

    fn next(&mut self) -> Option<Pileup> {
        while self.position < self.end {
            let position = self.position;
            self.position += 1;

            while let Some(read) = self.reads.get(self.next_read) {
                if read.pos > position {
                    break;
                }
                self.active.push(Arc::clone(read));
                self.next_read += 1;
            }
            self.active.retain(|read| read.end() > position);
            if self.active.is_empty() {
                continue;
            }

            let locus = Locus::new(Arc::clone(&self.contig), position);
            let pileup = if self.by_sample {
                Pileup::from_alignments_by_sample(locus, &self.active)
            } else {
                Pileup::from_alignments(locus, &self.active)
            };
            if !pileup.is_empty() {
                return Some(pileup);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ReadGroup;

    fn spliced_read() -> Arc<AlignedRead> {
        // 2S 3M 1I 2M 2D 2M, starting at 100
        Arc::new(AlignedRead::new(
            "spliced",
            "chr1",
            100,
            60,
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 2),
                CigarOp::new(CigarOpKind::Match, 3),
                CigarOp::new(CigarOpKind::Insertion, 1),
                CigarOp::new(CigarOpKind::Match, 2),
                CigarOp::new(CigarOpKind::Deletion, 2),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"nnACGTACGT".to_vec(),
            vec![30; 10],
        ))
    }

    #[test]
    fn flags_follow_the_cigar() {
        let read = spliced_read();

        let first = element_at(&read, 100).unwrap();
        assert_eq!(first.offset(), 2);
        assert!(first.is_next_to_soft_clip());
        assert_eq!(first.base(), b'A');

        let before_ins = element_at(&read, 102).unwrap();
        assert!(before_ins.is_before_insertion());
        let event = before_ins.next_event().unwrap();
        assert_eq!(event.length, 1);
        assert_eq!(event.bases.as_deref(), Some(&b"T"[..]));

        let after_ins = element_at(&read, 103).unwrap();
        assert!(after_ins.is_after_insertion());
        assert_eq!(after_ins.offset(), 6);

        let before_del = element_at(&read, 104).unwrap();
        assert!(before_del.is_before_deletion_start());
        assert_eq!(before_del.next_event().map(|e| e.length), Some(2));

        let deleted = element_at(&read, 105).unwrap();
        assert!(deleted.is_deletion());
        assert_eq!(deleted.base(), b'D');

        let after_del = element_at(&read, 107).unwrap();
        assert!(after_del.is_after_deletion_end());
        assert_eq!(after_del.offset(), 8);

        assert!(element_at(&read, 99).is_none());
        assert!(element_at(&read, 109).is_none());
    }

    #[test]
    fn skipped_regions_yield_no_element() {
        // 2M 100N 2M, starting at 10
        let read = Arc::new(AlignedRead::new(
            "intron",
            "chr1",
            10,
            60,
            vec![
                CigarOp::new(CigarOpKind::Match, 2),
                CigarOp::new(CigarOpKind::RefSkip, 100),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"ACGT".to_vec(),
            vec![30; 4],
        ));
        assert_eq!(read.end(), 114);

        let last_exon_base = element_at(&read, 11).unwrap();
        assert!(!last_exon_base.is_before_deletion_start());
        assert!(last_exon_base.next_event().is_none());
        assert!(element_at(&read, 12).is_none());
        assert!(element_at(&read, 50).is_none());
        assert!(element_at(&read, 111).is_none());

        let resumed = element_at(&read, 112).unwrap();
        assert_eq!(resumed.offset(), 2);
        assert_eq!(resumed.base(), b'G');
        assert!(!resumed.is_after_deletion_end());

        let pileup = Pileup::from_alignments(Locus::new("chr1", 50), &[read]);
        assert!(pileup.is_empty());
        assert_eq!(pileup.deletion_count(), 0);
    }

    #[test]
    fn reads_without_cigar_are_contiguous() {
        let read = Arc::new(AlignedRead::new("r", "chr1", 10, 60, Vec::new(), b"ACG".to_vec(), vec![30; 3]));
        assert_eq!(element_at(&read, 12).map(|e| e.base()), Some(b'G'));
        assert!(element_at(&read, 13).is_none());
    }

    #[test]
    fn alignments_are_grouped_by_sample() {
        let rg1 = Arc::new(ReadGroup::new("L1.s1", "s1"));
        let rg2 = Arc::new(ReadGroup::new("L1.s2", "s2"));
        let reads = vec![
            Arc::new(AlignedRead::new("a", "chr1", 0, 60, Vec::new(), b"AAAA".to_vec(), vec![30; 4]).with_read_group(rg1)),
            Arc::new(AlignedRead::new("b", "chr1", 2, 60, Vec::new(), b"CC".to_vec(), vec![30; 2]).with_read_group(rg2)),
            Arc::new(AlignedRead::new("c", "chr2", 0, 60, Vec::new(), b"GGGG".to_vec(), vec![30; 4])),
        ];

        let pileup = Pileup::from_alignments_by_sample(Locus::new("chr1", 2), &reads);
        assert!(pileup.tracker().is_per_sample());
        assert_eq!(pileup.len(), 2);
        assert_eq!(pileup.samples().len(), 2);

        let flat = Pileup::from_alignments(Locus::new("chr1", 1), &reads);
        assert_eq!(flat.bases(), b"A".to_vec());
    }

    #[test]
    fn walker_skips_uncovered_positions() {
        let reads = vec![
            Arc::new(AlignedRead::new("a", "chr1", 2, 60, Vec::new(), b"AC".to_vec(), vec![30; 2])),
            Arc::new(AlignedRead::new("b", "chr1", 6, 60, Vec::new(), b"G".to_vec(), vec![30])),
            Arc::new(AlignedRead::new("c", "chr1", 3, 60, Vec::new(), b"T".to_vec(), vec![30])),
        ];
        let positions: Vec<(u32, usize)> = PileupWalker::new("chr1", 0..10, &reads)
            .map(|p| (p.location().position, p.len()))
            .collect();
        assert_eq!(positions, vec![(2, 1), (3, 2), (6, 1)]);
    }
}
