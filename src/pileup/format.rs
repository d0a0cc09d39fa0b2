use super::Pileup;

/// Highest quality representable in the pileup text encoding.
const MAX_ENCODED_QUAL: u8 = 63;

/// Encode qualities as Phred+33 characters, clipping anything above 63.
pub fn quals_to_string(quals: &[u8]) -> String {
    quals
        .iter()
        .map(|&qual| char::from(33 + qual.min(MAX_ENCODED_QUAL)))
        .collect()
}

impl Pileup {
    /// Single-line pileup: `<contig> <position> <ref> <bases> <quals>`.
    ///
    /// The position is 1-based; bases and qualities follow element order.
    pub fn pileup_string(&self, reference_base: u8) -> String {
        let bases: String = self.iter().map(|e| char::from(e.base())).collect();
        format!(
            "{} {} {} {} {}",
            self.locus.contig(),
            self.locus.start(),
            char::from(reference_base),
            bases,
            quals_to_string(&self.quals())
        )
    }
}
