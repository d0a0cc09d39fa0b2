use std::path::PathBuf;

use readpile::genomics::io;
use readpile::pileup::PileupWalker;
use rust_htslib::bam::header::HeaderRecord;
use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::{self, Header, Record};

fn temp_bam(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("readpile-{}-{name}.bam", std::process::id()))
}

fn record(name: &[u8], pos: i64, cigar: Vec<Cigar>, seq: &[u8], rg: &str) -> Record {
    let mut record = Record::new();
    let quals = vec![30u8; seq.len()];
    record.set(name, Some(&CigarString(cigar)), seq, &quals);
    record.set_tid(0);
    record.set_pos(pos);
    record.set_mapq(60);
    record.push_aux(b"RG", Aux::String(rg)).expect("RG tag");
    record
}

fn write_bam(path: &PathBuf, records: &[Record]) {
    let mut header = Header::new();
    let mut sq = HeaderRecord::new(b"SQ");
    sq.push_tag(b"SN", &"chr1");
    sq.push_tag(b"LN", &100i64);
    header.push_record(&sq);
    for sample in ["s1", "s2"] {
        let id = format!("L1.{sample}");
        let mut rg = HeaderRecord::new(b"RG");
        rg.push_tag(b"ID", &id);
        rg.push_tag(b"SM", &sample);
        header.push_record(&rg);
    }

    let mut writer = bam::Writer::from_path(path, &header, bam::Format::Bam).expect("writer opens");
    for record in records {
        writer.write(record).expect("record written");
    }
}

fn records() -> Vec<Record> {
    vec![
        record(b"a", 10, vec![Cigar::Match(4)], b"ACGT", "L1.s1"),
        record(b"b", 12, vec![Cigar::Match(1), Cigar::Del(1), Cigar::Match(1)], b"GA", "L1.s2"),
        record(b"c", 60, vec![Cigar::Match(4)], b"TTTT", "L1.s1"),
    ]
}

fn names(reads: &[std::sync::Arc<readpile::AlignedRead>]) -> Vec<&str> {
    reads.iter().map(|read| read.name()).collect()
}

#[test]
fn reads_from_bam_feed_the_walker() {
    let path = temp_bam("walker");
    write_bam(&path, &records());

    let reads = io::load_reads(&path).expect("BAM loads");
    std::fs::remove_file(&path).ok();

    assert_eq!(reads.len(), 3);
    assert_eq!(reads[0].sample(), Some("s1"));
    assert_eq!(reads[1].reference_len(), 3);

    let pileups: Vec<_> = PileupWalker::new("chr1", 0..20, &reads).by_sample(true).collect();
    let positions: Vec<u32> = pileups.iter().map(|p| p.location().position).collect();
    assert_eq!(positions, vec![10, 11, 12, 13, 14]);

    let shared = &pileups[3];
    assert!(shared.tracker().is_per_sample());
    assert_eq!(shared.len(), 2);
    assert_eq!(shared.deletion_count(), 1);
    assert_eq!(shared.pileup_string(b'T'), "chr1 14 T TD ?1");
}

#[test]
fn missing_files_are_reported() {
    let error = io::load_reads(temp_bam("missing")).expect_err("missing file fails");
    assert!(error.to_string().contains("failed to open BAM file"));
}

#[test]
fn indexed_region_loads_only_overlapping_reads() {
    let path = temp_bam("indexed");
    write_bam(&path, &records());
    bam::index::build(&path, None, bam::index::Type::Bai, 1).expect("index builds");

    let left = io::load_region(&path, "chr1", 0..11).expect("region loads");
    let middle = io::load_region(&path, "chr1", 13..14).expect("region loads");
    let right = io::load_region(&path, "chr1", 62..90).expect("region loads");
    let unknown = io::load_region(&path, "chr9", 0..10);

    std::fs::remove_file(&path).ok();
    std::fs::remove_file(path.with_extension("bam.bai")).ok();

    assert_eq!(names(&left), vec!["a"]);
    assert_eq!(names(&middle), vec!["a", "b"]);
    assert_eq!(names(&right), vec!["c"]);
    assert!(unknown.is_err());
}

#[test]
fn unindexed_region_falls_back_to_a_full_scan() {
    let path = temp_bam("unindexed");
    write_bam(&path, &records());

    let reads = io::load_region(&path, "chr1", 13..14).expect("region loads");
    std::fs::remove_file(&path).ok();

    assert_eq!(names(&reads), vec!["a", "b"]);
}

#[test]
fn reference_bases_come_from_the_named_contig() {
    let path = std::env::temp_dir().join(format!("readpile-{}-two.fa", std::process::id()));
    std::fs::write(&path, ">chr1\nAAAA\n>chr2 second record\ncgtt\n").expect("FASTA written");

    let chr2 = io::fetch_reference(&path, "chr2", 0..2).expect("chr2 fetched");
    let chr1 = io::fetch_reference(&path, "chr1", 1..3).expect("chr1 fetched");
    let past_end = io::fetch_reference(&path, "chr2", 2..10).expect("tail fetched");
    let missing = io::fetch_reference(&path, "chr3", 0..1);

    std::fs::remove_file(&path).ok();
    std::fs::remove_file(path.with_extension("fa.fai")).ok();

    assert_eq!(chr2, b"CG".to_vec());
    assert_eq!(chr1, b"AA".to_vec());
    assert_eq!(past_end, b"TT".to_vec());
    assert!(missing.is_err());
}
