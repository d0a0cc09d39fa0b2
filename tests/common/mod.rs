#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use readpile::pileup::ElementFlags;
use readpile::{AlignedRead, CigarOp, CigarOpKind, PileupElement, ReadGroup};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("READPILE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set READPILE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Single-base read on chr1 starting at `start` (0-based).
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

/// Full-length read on chr1 with uniform qualities.
pub fn matched_read(name: &str, start: u32, sequence: &[u8], mapq: u8) -> AlignedRead {
    AlignedRead::new(
        name,
        "chr1",
        start,
        mapq,
        vec![CigarOp::new(CigarOpKind::Match, sequence.len() as u32)],
        sequence.to_vec(),
        vec![30; sequence.len()],
    )
}

pub fn sample_group(sample: &str) -> Arc<ReadGroup> {
    Arc::new(ReadGroup::new(format!("L1.{sample}"), sample))
}

pub fn element(read: Arc<AlignedRead>, deletion: bool) -> PileupElement {
    let flags = if deletion {
        ElementFlags::deletion()
    } else {
        ElementFlags::default()
    };
    PileupElement::new(read, 0, flags)
}
