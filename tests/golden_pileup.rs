#[path = "common/mod.rs"]
mod common;
use common::assert_snapshot;
use readpile::pileup::PileupWalker;
use readpile::{AlignedRead, CigarOp, CigarOpKind, PileupConfig};
use std::sync::Arc;

#[test]
fn window_pileup_matches_golden() {
    let reads = vec![
        Arc::new(common::matched_read("r1", 0, b"ACGT", 60)),
        Arc::new(AlignedRead::new(
            "r2",
            "chr1",
            1,
            60,
            vec![
                CigarOp::new(CigarOpKind::Match, 1),
                CigarOp::new(CigarOpKind::Deletion, 1),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"CTA".to_vec(),
            vec![20; 3],
        )),
        Arc::new(common::matched_read("r3", 2, b"GTA", 0)),
    ];
    let reference = b"ACGTAC";
    let config = PileupConfig::default();
    let mut rng = config.rng();

    let lines: Vec<String> = PileupWalker::new("chr1", 0..6, &reads)
        .map(|pileup| {
            let filtered = config.apply(&pileup, &mut rng).expect("filters apply");
            filtered.pileup_string(reference[pileup.location().position as usize])
        })
        .collect();

    assert_snapshot("pileup/window.txt", &lines.join("\n"));
}
