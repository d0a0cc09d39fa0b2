//! BAM and reference FASTA input for pileups.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, record::Aux, record::Cigar, Read, Record};
use rust_htslib::faidx;
use tracing::{debug, warn};

use super::{AlignedRead, CigarOp, CigarOpKind, ReadGroup};

/// Read groups declared in a header, keyed by identifier.
pub type ReadGroups = HashMap<String, Arc<ReadGroup>>;

/// Collect the `@RG` lines of a BAM header.
pub fn read_groups(header: &bam::HeaderView) -> ReadGroups {
    let header = bam::Header::from_template(header);
    let records = header.to_hashmap();
    records
        .get("RG")
        .into_iter()
        .flatten()
        .filter_map(|fields| {
            let id = fields.get("ID")?;
            let group = ReadGroup {
                id: Some(Arc::from(id.as_str())),
                sample: fields.get("SM").map(|sm| Arc::from(sm.as_str())),
            };
            Some((id.clone(), Arc::new(group)))
        })
        .collect()
}

fn convert_cigar(op: &Cigar) -> CigarOp {
    match *op {
        Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
            CigarOp::new(CigarOpKind::Match, len)
        }
        Cigar::Ins(len) => CigarOp::new(CigarOpKind::Insertion, len),
        Cigar::Del(len) => CigarOp::new(CigarOpKind::Deletion, len),
        Cigar::RefSkip(len) => CigarOp::new(CigarOpKind::RefSkip, len),
        Cigar::SoftClip(len) => CigarOp::new(CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) | Cigar::Pad(len) => CigarOp::new(CigarOpKind::HardClip, len),
    }
}

/// Convert a mapped BAM record aligned to `contig`.
///
/// The read group is resolved through the `RG` tag; identifiers missing from
/// `groups` yield a read group without a sample. Returns `None` for unmapped
/// records.
pub fn aligned_read_from_record(
    record: &Record,
    contig: Arc<str>,
    groups: &ReadGroups,
) -> Option<AlignedRead> {
    if record.is_unmapped() {
        return None;
    }
    let pos = u32::try_from(record.pos()).ok()?;
    let name = String::from_utf8_lossy(record.qname()).into_owned();
    let cigar = record.cigar().iter().map(convert_cigar).collect();

    let mut read = AlignedRead::new(
        name,
        contig,
        pos,
        record.mapq(),
        cigar,
        record.seq().as_bytes(),
        record.qual().to_vec(),
    )
    .with_reverse_strand(record.is_reverse());

    if let Ok(Aux::String(id)) = record.aux(b"RG") {
        let group = groups.get(id).cloned().unwrap_or_else(|| {
            warn!(read_group = id, "read group missing from header");
            Arc::new(ReadGroup {
                id: Some(Arc::from(id)),
                sample: None,
            })
        });
        read = read.with_read_group(group);
    }
    Some(read)
}

fn collect_records<R: Read>(reader: &mut R) -> Result<(Vec<Arc<AlignedRead>>, usize)> {
    let header = reader.header().clone();
    let groups = read_groups(&header);
    let contigs: Vec<Arc<str>> = (0..header.target_count())
        .map(|tid| Arc::from(String::from_utf8_lossy(header.tid2name(tid)).as_ref()))
        .collect();

    let mut reads = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("failed to read record {}", idx + 1))?;
        let contig = usize::try_from(record.tid())
            .ok()
            .and_then(|tid| contigs.get(tid))
            .cloned();
        match contig.and_then(|contig| aligned_read_from_record(&record, contig, &groups)) {
            Some(read) => reads.push(Arc::new(read)),
            None => skipped += 1,
        }
    }
    Ok((reads, skipped))
}

fn overlaps(read: &AlignedRead, contig: &str, window: &Range<u32>) -> bool {
    *read.chrom == *contig && read.pos < window.end && read.end() > window.start
}

/// Load every mapped read of a BAM file.
pub fn load_reads<P: AsRef<Path>>(path: P) -> Result<Vec<Arc<AlignedRead>>> {
    let path = path.as_ref();
    let mut reader = bam::Reader::from_path(path)
        .with_context(|| format!("failed to open BAM file {}", path.display()))?;

    let (reads, skipped) = collect_records(&mut reader)?;
    debug!(path = %path.display(), reads = reads.len(), skipped, "loaded reads");
    Ok(reads)
}

/// Load the mapped reads overlapping the 0-based half-open `window` of
/// `contig`.
///
/// Indexed BAM files are queried for the region only. Without an index the
/// whole file is scanned and filtered.
pub fn load_region<P: AsRef<Path>>(
    path: P,
    contig: &str,
    window: Range<u32>,
) -> Result<Vec<Arc<AlignedRead>>> {
    let path = path.as_ref();
    let mut reader = match bam::IndexedReader::from_path(path) {
        Ok(reader) => reader,
        Err(error) => {
            warn!(path = %path.display(), %error, "no usable BAM index, scanning the whole file");
            let reads = load_reads(path)?;
            return Ok(reads
                .into_iter()
                .filter(|read| overlaps(read, contig, &window))
                .collect());
        }
    };

    reader
        .fetch((contig, i64::from(window.start), i64::from(window.end)))
        .with_context(|| {
            format!(
                "failed to fetch {contig}:{}-{} from {}",
                window.start + 1,
                window.end,
                path.display()
            )
        })?;
    let (reads, skipped) = collect_records(&mut reader)?;
    let reads: Vec<_> = reads
        .into_iter()
        .filter(|read| overlaps(read, contig, &window))
        .collect();

    debug!(path = %path.display(), contig, reads = reads.len(), skipped, "loaded region");
    Ok(reads)
}

/// Reference bases of `contig` over the 0-based half-open `window`, read
/// from an indexed (or indexable) FASTA file.
///
/// The result is shorter than the window when the window runs past the end
/// of the contig.
pub fn fetch_reference<P: AsRef<Path>>(path: P, contig: &str, window: Range<u32>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if window.is_empty() {
        return Ok(Vec::new());
    }
    let reader = faidx::Reader::from_path(path)
        .with_context(|| format!("failed to open reference {}", path.display()))?;
    let bases = reader
        .fetch_seq(contig, window.start as usize, window.end as usize - 1)
        .with_context(|| format!("failed to fetch {contig} from reference {}", path.display()))?;
    Ok(bases.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::CigarString;

    fn record() -> Record {
        let mut record = Record::new();
        record.set(
            b"frag1",
            Some(&CigarString(vec![Cigar::SoftClip(1), Cigar::Match(2), Cigar::Del(1), Cigar::Match(1)])),
            b"NACG",
            &[10, 20, 30, 40],
        );
        record.set_pos(41);
        record.set_mapq(55);
        record.set_reverse();
        record
    }

    #[test]
    fn converts_record_fields() {
        let mut groups = ReadGroups::new();
        groups.insert("L1.s1".to_string(), Arc::new(ReadGroup::new("L1.s1", "s1")));
        let mut record = record();
        record.push_aux(b"RG", Aux::String("L1.s1")).unwrap();

        let read = aligned_read_from_record(&record, Arc::from("chr7"), &groups).unwrap();
        assert_eq!(read.name(), "frag1");
        assert_eq!(&*read.chrom, "chr7");
        assert_eq!(read.pos, 41);
        assert_eq!(read.mapq(), 55);
        assert!(read.is_reverse);
        assert_eq!(&*read.sequence, b"NACG");
        assert_eq!(&*read.qualities, &[10, 20, 30, 40]);
        assert_eq!(read.reference_len(), 4);
        assert_eq!(read.sample(), Some("s1"));
    }

    #[test]
    fn skipped_regions_stay_distinct_from_deletions() {
        let mut record = Record::new();
        record.set(
            b"spliced",
            Some(&CigarString(vec![Cigar::Match(2), Cigar::RefSkip(100), Cigar::Match(2)])),
            b"ACGT",
            &[30; 4],
        );
        record.set_pos(10);

        let read = aligned_read_from_record(&record, Arc::from("chr1"), &ReadGroups::new()).unwrap();
        assert_eq!(read.cigar[1], CigarOp::new(CigarOpKind::RefSkip, 100));
        assert_eq!(read.reference_len(), 104);
    }

    #[test]
    fn unknown_read_groups_keep_their_id() {
        let mut record = record();
        record.push_aux(b"RG", Aux::String("L9")).unwrap();
        let read = aligned_read_from_record(&record, Arc::from("chr7"), &ReadGroups::new()).unwrap();
        assert_eq!(read.read_group_id(), Some("L9"));
        assert_eq!(read.sample(), None);
    }

    #[test]
    fn unmapped_records_are_skipped() {
        let mut record = record();
        record.set_unmapped();
        assert!(aligned_read_from_record(&record, Arc::from("chr7"), &ReadGroups::new()).is_none());
    }
}
