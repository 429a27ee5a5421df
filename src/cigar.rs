//! CIGAR decomposition and 5′ start correction.
//!
//! The reported SAM position is the leftmost *aligned* reference base. For deduplication we
//! want the position where the sequenced fragment actually starts, which depends on the
//! strand and on bases that were soft clipped or consumed on the reference.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;

use crate::record::Strand;

/// CIGAR value used by SAM for "no alignment information".
pub const UNAVAILABLE: &str = "*";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
}

impl Kind {
    fn from_op_char(c: char) -> Result<Kind, CigarError> {
        match c {
            'M' => Ok(Kind::Match),
            'I' => Ok(Kind::Insertion),
            'D' => Ok(Kind::Deletion),
            'N' => Ok(Kind::Skip),
            'S' => Ok(Kind::SoftClip),
            'H' | 'P' | '=' | 'X' => Err(CigarError::UnsupportedOp(c)),
            c => Err(CigarError::InvalidOp(c)),
        }
    }

    /// Operations counted as reference span when locating the 5′ end of a reverse read.
    pub fn consumes_reference(&self) -> bool {
        matches!(self, Kind::Match | Kind::Deletion | Kind::Skip)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Op {
    pub kind: Kind,
    pub len: u32,
}

impl Op {
    pub fn new(kind: Kind, len: u32) -> Op {
        Op { kind, len }
    }
}

/// A decomposed CIGAR string. An unavailable CIGAR (`*`) has no operations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cigar(SmallVec<[Op; 8]>);

fn op_regex() -> &'static Regex {
    static OP_RE: OnceLock<Regex> = OnceLock::new();
    // the length is optional here so a missing length is reported instead of skipped
    OP_RE.get_or_init(|| Regex::new(r"([0-9]*)([^0-9])").expect("valid CIGAR regex"))
}

impl FromStr for Cigar {
    type Err = CigarError;

    fn from_str(s: &str) -> Result<Cigar, Self::Err> {
        if s.is_empty() {
            return Err(CigarError::Empty);
        }
        if s == UNAVAILABLE {
            return Ok(Cigar::default());
        }

        let mut ops = SmallVec::new();
        let mut end = 0;
        for caps in op_regex().captures_iter(s) {
            let (_, [digits, op]) = caps.extract();
            let op = op.chars().next().ok_or(CigarError::Empty)?;
            if digits.is_empty() {
                return Err(CigarError::MissingLength(op));
            }
            let len: u32 = lexical_core::parse(digits.as_bytes())
                .map_err(|_| CigarError::InvalidLength(digits.to_string()))?;
            if len == 0 {
                return Err(CigarError::InvalidLength(digits.to_string()));
            }
            ops.push(Op::new(Kind::from_op_char(op)?, len));
            end = caps.get(0).map(|m| m.end()).unwrap_or(end);
        }

        if end != s.len() {
            return Err(CigarError::DanglingLength(s[end..].to_string()));
        }

        Ok(Cigar(ops))
    }
}

impl Cigar {
    pub fn ops(&self) -> &[Op] {
        &self.0
    }

    pub fn is_unavailable(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every match, deletion and skipped-region length in the alignment.
    pub fn reference_len(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| u64::from(op.len))
            .sum()
    }

    pub fn leading_soft_clip(&self) -> u32 {
        match self.0.first() {
            Some(op) if op.kind == Kind::SoftClip => op.len,
            _ => 0,
        }
    }

    pub fn trailing_soft_clip(&self) -> u32 {
        match self.0.last() {
            Some(op) if op.kind == Kind::SoftClip => op.len,
            _ => 0,
        }
    }

    /// Move the reported 1-based `position` to the 5′ start of the sequenced fragment.
    ///
    /// Forward reads lose their leading soft clip. Reverse reads start at the far end of the
    /// alignment: the reported position plus the reference span plus any trailing soft clip.
    /// The result may drop below 1 for forward reads clipped at the start of a reference.
    pub fn corrected_start(&self, position: u32, strand: Strand) -> i64 {
        let position = i64::from(position);
        match strand {
            Strand::Forward => position - i64::from(self.leading_soft_clip()),
            Strand::Reverse => position
                .saturating_add_unsigned(self.reference_len())
                .saturating_add(i64::from(self.trailing_soft_clip())),
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CigarError {
    #[error("empty CIGAR string")]
    Empty,
    #[error("CIGAR operation '{0}' has no length")]
    MissingLength(char),
    #[error("invalid CIGAR operation length '{0}'")]
    InvalidLength(String),
    #[error("CIGAR ends with a length but no operation: '{0}'")]
    DanglingLength(String),
    #[error("invalid CIGAR operation '{0}'")]
    InvalidOp(char),
    #[error("unsupported CIGAR operation '{0}'")]
    UnsupportedOp(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrected(position: u32, cigar: &str, strand: Strand) -> i64 {
        cigar.parse::<Cigar>().unwrap().corrected_start(position, strand)
    }

    #[test]
    fn decompose() {
        let c: Cigar = "3S10M2I5D4N20M1S".parse().unwrap();
        assert_eq!(
            c.ops(),
            &[
                Op::new(Kind::SoftClip, 3),
                Op::new(Kind::Match, 10),
                Op::new(Kind::Insertion, 2),
                Op::new(Kind::Deletion, 5),
                Op::new(Kind::Skip, 4),
                Op::new(Kind::Match, 20),
                Op::new(Kind::SoftClip, 1),
            ]
        );
        assert_eq!(c.reference_len(), 39);
        assert_eq!(c.leading_soft_clip(), 3);
        assert_eq!(c.trailing_soft_clip(), 1);
    }

    #[test]
    fn forward_strand() {
        assert_eq!(corrected(100, "2S50M", Strand::Forward), 98);
        assert_eq!(corrected(100, "50M2S", Strand::Forward), 100);
        assert_eq!(corrected(100, "50M", Strand::Forward), 100);
        assert_eq!(corrected(1, "5S20M", Strand::Forward), -4);
    }

    #[test]
    fn reverse_strand() {
        assert_eq!(corrected(100, "50M2S", Strand::Reverse), 152);
        assert_eq!(corrected(100, "2S50M", Strand::Reverse), 150);
        assert_eq!(corrected(100, "20M3D30M", Strand::Reverse), 153);
    }

    #[test]
    fn reverse_strand_spliced_sums_every_block() {
        assert_eq!(corrected(1000, "30M200N20M5S", Strand::Reverse), 1255);
        assert_eq!(
            corrected(1000, "10M100N10M100N10M2D10M", Strand::Reverse),
            1000 + 200 + 40 + 2
        );
    }

    #[test]
    fn insertions_do_not_move_start() {
        assert_eq!(corrected(500, "10M5I10M", Strand::Reverse), 520);
        assert_eq!(corrected(500, "10M5I10M", Strand::Forward), 500);
    }

    #[test]
    fn extremes_stay_in_range() {
        let max = u32::MAX;
        assert_eq!(corrected(max, "50M", Strand::Reverse), i64::from(max) + 50);
        assert_eq!(corrected(0, "4294967295S1M", Strand::Forward), -4294967295);
    }

    #[test]
    fn unavailable() {
        let c: Cigar = "*".parse().unwrap();
        assert!(c.is_unavailable());
        assert_eq!(c.corrected_start(42, Strand::Forward), 42);
        assert_eq!(c.corrected_start(42, Strand::Reverse), 42);
    }

    #[test]
    fn anomalies() {
        assert_eq!("".parse::<Cigar>(), Err(CigarError::Empty));
        assert_eq!("M".parse::<Cigar>(), Err(CigarError::MissingLength('M')));
        assert_eq!("10M5".parse::<Cigar>(), Err(CigarError::DanglingLength("5".into())));
        assert_eq!("10Q".parse::<Cigar>(), Err(CigarError::InvalidOp('Q')));
        assert_eq!("0M".parse::<Cigar>(), Err(CigarError::InvalidLength("0".into())));
        assert_eq!("5H50M".parse::<Cigar>(), Err(CigarError::UnsupportedOp('H')));
        assert_eq!("50=".parse::<Cigar>(), Err(CigarError::UnsupportedOp('=')));
        assert_eq!("25M25X".parse::<Cigar>(), Err(CigarError::UnsupportedOp('X')));
        assert!("99999999999M".parse::<Cigar>().is_err());
    }
}
