use ahash::AHashSet;

use crate::record::Fingerprint;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkResult {
    Unique,
    Duplicate,
    UnknownUmi,
}

/// Every fingerprint written so far in the run. Never shrinks.
#[derive(Debug, Default)]
pub struct DuplicateIndex(AHashSet<Fingerprint>);

impl DuplicateIndex {
    pub fn new() -> DuplicateIndex {
        DuplicateIndex(AHashSet::new())
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.0.contains(fingerprint)
    }

    /// Returns `true` when the fingerprint was not yet in the index.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.0.insert(fingerprint)
    }

    /// Decide the fate of a read: the first read with a fingerprint is unique, all later ones
    /// are duplicates.
    pub fn mark(&mut self, fingerprint: Fingerprint) -> MarkResult {
        if self.contains(&fingerprint) {
            MarkResult::Duplicate
        } else {
            self.insert(fingerprint);
            MarkResult::Unique
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The UMI whitelist. Reads carrying any other UMI are dropped.
#[derive(Debug, Default, Clone)]
pub struct KnownUmis(AHashSet<String>);

impl KnownUmis {
    pub fn contains(&self, umi: &str) -> bool {
        self.0.contains(umi)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownUmis {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        KnownUmis(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Strand;

    fn fp(umi: &str, reference: &str, strand: Strand, position: i64) -> Fingerprint {
        Fingerprint {
            umi: umi.to_string(),
            reference: reference.to_string(),
            strand,
            position,
        }
    }

    #[test]
    fn first_is_unique_rest_duplicate() {
        let mut index = DuplicateIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.mark(fp("AACGCCAT", "1", Strand::Forward, 98)), MarkResult::Unique);
        assert_eq!(index.mark(fp("AACGCCAT", "1", Strand::Forward, 98)), MarkResult::Duplicate);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn every_component_distinguishes() {
        let mut index = DuplicateIndex::new();
        let base = fp("AACGCCAT", "1", Strand::Forward, 98);
        assert!(index.insert(base.clone()));
        assert!(index.contains(&base));

        for other in [
            fp("AAGGTACG", "1", Strand::Forward, 98),
            fp("AACGCCAT", "2", Strand::Forward, 98),
            fp("AACGCCAT", "1", Strand::Reverse, 98),
            fp("AACGCCAT", "1", Strand::Forward, 99),
        ] {
            assert!(!index.contains(&other));
            assert_eq!(index.mark(other), MarkResult::Unique);
        }
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn known_umis() {
        let umis: KnownUmis = ["AACGCCAT", "AAGGTACG"].into_iter().collect();
        assert_eq!(umis.len(), 2);
        assert!(umis.contains("AACGCCAT"));
        assert!(!umis.contains("NNNNNNNN"));
    }
}
