use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Simple CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region, such as an intron.
    RefSkip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

impl CigarOpKind {
    /// Whether the operation advances along the reference.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match | CigarOpKind::Deletion | CigarOpKind::RefSkip
        )
    }

    /// Whether the operation advances along the read sequence.
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match | CigarOpKind::Insertion | CigarOpKind::SoftClip
        )
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Genomic coordinate a pileup is anchored to.
///
/// Positions are 0-based, matching [`AlignedRead::pos`]; the textual form is
/// 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locus {
    /// Reference contig/chromosome name.
    pub contig: Arc<str>,
    /// 0-based reference coordinate.
    pub position: u32,
}

impl Locus {
    /// Construct a locus on `contig` at the 0-based `position`.
    pub fn new(contig: impl Into<Arc<str>>, position: u32) -> Self {
        Self {
            contig: contig.into(),
            position,
        }
    }

    /// Contig name.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// 1-based coordinate, as printed in pileup lines.
    pub fn start(&self) -> u32 {
        self.position + 1
    }
}

impl Ord for Locus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.contig
            .cmp(&other.contig)
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for Locus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.start())
    }
}

/// Read group a read was sequenced in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ReadGroup {
    /// Read group identifier (`RG:ID`), usually `<lane>` or `<lane>.<sample>`.
    pub id: Option<Arc<str>>,
    /// Sample the read group belongs to (`RG:SM`).
    pub sample: Option<Arc<str>>,
}

impl ReadGroup {
    /// Read group with both an identifier and a sample name.
    pub fn new(id: impl Into<Arc<str>>, sample: impl Into<Arc<str>>) -> Self {
        Self {
            id: Some(id.into()),
            sample: Some(sample.into()),
        }
    }

    /// Read group identifier, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Sample name, if any.
    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Read (template) name; mates share it.
    pub name: Arc<str>,
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
    /// Whether the read maps to the reverse complement strand.
    pub is_reverse: bool,
    /// Read group the read belongs to.
    pub read_group: Option<Arc<ReadGroup>>,
    /// Per-base observation counts for reduced (consensus) reads.
    pub reduced_counts: Option<Arc<[u8]>>,
}

impl AlignedRead {
    /// Construct a new forward-strand aligned read without a read group.
    pub fn new(
        name: impl Into<Arc<str>>,
        chrom: impl Into<Arc<str>>,
        pos: u32,
        mapq: u8,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            chrom: chrom.into(),
            pos,
            mapq,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            is_reverse: false,
            read_group: None,
            reduced_counts: None,
        }
    }

    /// Set the strand of the alignment.
    pub fn with_reverse_strand(mut self, is_reverse: bool) -> Self {
        self.is_reverse = is_reverse;
        self
    }

    /// Attach the read to a read group.
    pub fn with_read_group(mut self, read_group: Arc<ReadGroup>) -> Self {
        self.read_group = Some(read_group);
        self
    }

    /// Mark the read as a reduced read carrying per-base observation counts.
    pub fn with_reduced_counts(mut self, counts: impl Into<Arc<[u8]>>) -> Self {
        self.reduced_counts = Some(counts.into());
        self
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Read name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based alignment start on the reference.
    pub fn alignment_start(&self) -> u32 {
        self.pos
    }

    /// Number of reference bases spanned by the alignment.
    ///
    /// Reads without a CIGAR are treated as a contiguous match.
    pub fn reference_len(&self) -> u32 {
        if self.cigar.is_empty() {
            return self.len() as u32;
        }
        self.cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len)
            .sum()
    }

    /// End position (half-open) on the reference.
    pub fn end(&self) -> u32 {
        self.pos + self.reference_len()
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }

    /// Mapping quality associated with the alignment.
    pub fn mapq(&self) -> u8 {
        self.mapq
    }

    /// Read group identifier, if the read has a read group with an id.
    pub fn read_group_id(&self) -> Option<&str> {
        self.read_group.as_deref().and_then(ReadGroup::id)
    }

    /// Sample name, if the read has a read group with a sample.
    pub fn sample(&self) -> Option<&str> {
        self.read_group.as_deref().and_then(ReadGroup::sample)
    }

    /// Whether the read is a reduced read.
    pub fn is_reduced(&self) -> bool {
        self.reduced_counts.is_some()
    }

    /// Number of observations collapsed into the base at `offset`.
    pub fn reduced_count_at(&self, offset: usize) -> Option<u8> {
        self.reduced_counts
            .as_deref()
            .and_then(|counts| counts.get(offset).copied())
    }
}
