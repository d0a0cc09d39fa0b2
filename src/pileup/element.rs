use std::sync::Arc;

use crate::genomics::AlignedRead;

/// Base reported for elements that sit inside a deletion.
pub const DELETION_BASE: u8 = b'D';

/// Quality reported for elements that sit inside a deletion.
pub const DELETION_QUAL: u8 = 16;

/// Adjacency of an element to indels and clipping in its read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementFlags {
    /// The read has a deletion spanning the locus.
    pub is_deletion: bool,
    /// The next reference base of the read is deleted.
    pub before_deletion: bool,
    /// The previous reference base of the read was deleted.
    pub after_deletion: bool,
    /// Bases are inserted after this element.
    pub before_insertion: bool,
    /// Bases were inserted before this element.
    pub after_insertion: bool,
    /// The element borders a soft clip.
    pub next_to_soft_clip: bool,
}

impl ElementFlags {
    /// Flags for a deletion element.
    pub fn deletion() -> Self {
        Self {
            is_deletion: true,
            ..Self::default()
        }
    }
}

/// Indel event that follows an element in its read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextEvent {
    /// Inserted bases, or `None` for deletions.
    pub bases: Option<Arc<[u8]>>,
    /// Event length in bases.
    pub length: u32,
}

/// One read's observation at a locus.
///
/// Elements are immutable and cheap to clone: the read is shared.
#[derive(Debug, Clone)]
pub struct PileupElement {
    read: Arc<AlignedRead>,
    offset: usize,
    flags: ElementFlags,
    next_event: Option<NextEvent>,
}

impl PileupElement {
    /// Element with explicit adjacency flags.
    pub fn new(read: Arc<AlignedRead>, offset: usize, flags: ElementFlags) -> Self {
        Self {
            read,
            offset,
            flags,
            next_event: None,
        }
    }

    /// Plain base observation with no indel or clipping context.
    pub fn simple(read: Arc<AlignedRead>, offset: usize) -> Self {
        Self::new(read, offset, ElementFlags::default())
    }

    /// Attach the indel event following this element.
    pub fn with_next_event(mut self, event: NextEvent) -> Self {
        self.next_event = Some(event);
        self
    }

    /// Read backing this element.
    pub fn read(&self) -> &Arc<AlignedRead> {
        &self.read
    }

    /// Offset of the observed base within the read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Adjacency flags.
    pub fn flags(&self) -> ElementFlags {
        self.flags
    }

    /// Indel event following this element, if tracked.
    pub fn next_event(&self) -> Option<&NextEvent> {
        self.next_event.as_ref()
    }

    /// Whether the read has a deletion at the locus.
    pub fn is_deletion(&self) -> bool {
        self.flags.is_deletion
    }

    /// Whether a deletion starts right after this element.
    pub fn is_before_deletion_start(&self) -> bool {
        self.flags.before_deletion
    }

    /// Whether a deletion ends right before this element.
    pub fn is_after_deletion_end(&self) -> bool {
        self.flags.after_deletion
    }

    /// Whether an insertion follows this element.
    pub fn is_before_insertion(&self) -> bool {
        self.flags.before_insertion
    }

    /// Whether an insertion precedes this element.
    pub fn is_after_insertion(&self) -> bool {
        self.flags.after_insertion
    }

    /// Whether the element borders a soft clip.
    pub fn is_next_to_soft_clip(&self) -> bool {
        self.flags.next_to_soft_clip
    }

    /// Called base, [`DELETION_BASE`] for deletions and `N` past the read end.
    pub fn base(&self) -> u8 {
        if self.is_deletion() {
            DELETION_BASE
        } else {
            self.read.base_at(self.offset).unwrap_or(b'N')
        }
    }

    /// Base quality, [`DELETION_QUAL`] for deletions.
    pub fn qual(&self) -> u8 {
        if self.is_deletion() {
            DELETION_QUAL
        } else {
            self.read.quality_at(self.offset).unwrap_or(0)
        }
    }

    /// Mapping quality of the backing read.
    pub fn mapping_qual(&self) -> u8 {
        self.read.mapq()
    }

    /// Number of physical observations this element stands for.
    pub fn representative_count(&self) -> usize {
        if self.read.is_reduced() {
            self.read
                .reduced_count_at(self.offset)
                .map_or(1, |count| usize::from(count).max(1))
        } else {
            1
        }
    }
}
