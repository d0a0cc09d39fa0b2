use std::collections::HashMap;

use super::PileupElement;

/// Reconciles mates of a read pair that both overlap the locus.
///
/// Mates are recognised by a shared read name. At most two elements per name
/// are expected at one locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapResolver {
    /// Drop both mates when they disagree on the called base.
    pub discard_discordant: bool,
    /// Compare base qualities rather than mapping qualities.
    pub base_qual_not_map_qual: bool,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl OverlapResolver {
    /// Resolver with explicit policies.
    pub fn new(discard_discordant: bool, base_qual_not_map_qual: bool) -> Self {
        Self {
            discard_discordant,
            base_qual_not_map_qual,
        }
    }

    fn quality(&self, element: &PileupElement) -> u8 {
        if self.base_qual_not_map_qual {
            element.qual()
        } else {
            element.mapping_qual()
        }
    }

    /// Keep at most one element per read name.
    ///
    /// The survivor takes the position of the first mate; ties keep the first
    /// mate.
    pub fn resolve(&self, elements: &[PileupElement]) -> Vec<PileupElement> {
        let mut kept: Vec<Option<&PileupElement>> = Vec::with_capacity(elements.len());
        let mut slots: HashMap<&str, usize> = HashMap::with_capacity(elements.len());

        for element in elements {
            let name = element.read().name();
            let Some(&slot) = slots.get(name) else {
                slots.insert(name, kept.len());
                kept.push(Some(element));
                continue;
            };

            let Some(existing) = kept[slot] else {
                continue;
            };
            if self.discard_discordant && existing.base() != element.base() {
                kept[slot] = None;
                slots.remove(name);
            } else if self.quality(existing) < self.quality(element) {
                kept[slot] = Some(element);
            }
        }

        kept.into_iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn names(elements: &[PileupElement]) -> Vec<&str> {
        elements.iter().map(|e| e.read().name()).collect()
    }

    #[test]
    fn discordant_mates_are_both_dropped() {
        let elements = vec![
            element("pair", b'A', 30, 60),
            element("solo", b'C', 30, 60),
            element("pair", b'G', 35, 60),
        ];
        let resolved = OverlapResolver::default().resolve(&elements);
        assert_eq!(names(&resolved), vec!["solo"]);
    }

    #[test]
    fn concordant_mates_keep_higher_base_quality() {
        let elements = vec![
            element("pair", b'A', 20, 60),
            element("solo", b'C', 30, 60),
            element("pair", b'A', 35, 10),
        ];
        let resolved = OverlapResolver::default().resolve(&elements);
        assert_eq!(names(&resolved), vec!["pair", "solo"]);
        assert_eq!(resolved[0].qual(), 35);
    }

    #[test]
    fn mapping_quality_decides_when_requested() {
        let elements = vec![element("pair", b'A', 20, 60), element("pair", b'A', 35, 10)];
        let resolved = OverlapResolver::new(true, false).resolve(&elements);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].mapping_qual(), 60);
    }

    #[test]
    fn discordant_mates_survive_without_discarding() {
        let elements = vec![element("pair", b'A', 20, 60), element("pair", b'T', 35, 60)];
        let resolved = OverlapResolver::new(false, true).resolve(&elements);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].base(), b'T');
    }

    #[test]
    fn quality_ties_keep_the_first_mate() {
        let elements = vec![element("pair", b'A', 30, 60), element("pair", b'A', 30, 40)];
        let resolved = OverlapResolver::default().resolve(&elements);
        assert_eq!(resolved[0].mapping_qual(), 60);
    }
}
