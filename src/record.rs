use noodles_sam::alignment::record::Flags;
use thiserror::Error;

use crate::cigar::{Cigar, CigarError};

/// Minimum number of tab separated fields needed to reach the CIGAR column.
const MIN_FIELDS: usize = 6;
/// The UMI is the 8th colon separated component of the read name.
const UMI_COMPONENT: usize = 7;
/// Largest POS value allowed by SAM (2^31 - 1).
pub const MAX_POSITION: u32 = i32::MAX as u32;

/// A classified input line.
#[derive(Debug, Eq, PartialEq)]
pub enum SamLine {
    EndOfStream,
    Header(String),
    Alignment(Record),
}

impl SamLine {
    /// Classify a line as returned by a line reader, trailing newline included. A zero length
    /// line means the reader is exhausted.
    pub fn parse(line: &str) -> Result<SamLine, RecordError> {
        if line.is_empty() {
            return Ok(SamLine::EndOfStream);
        }

        let line = line.trim_end_matches(['\n', '\r']);
        if line.starts_with('@') {
            Ok(SamLine::Header(line.to_string()))
        } else {
            Record::parse(line).map(SamLine::Alignment)
        }
    }
}

/// One alignment line. The original text is kept so the line can be written back untouched.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    pub name: String,
    pub umi: String,
    pub flag: u16,
    pub reference: String,
    pub position: u32,
    pub cigar: String,
    pub raw_line: String,
}

impl Record {
    pub fn parse(line: &str) -> Result<Record, RecordError> {
        let fields: Vec<&str> = line.splitn(MIN_FIELDS + 1, '\t').collect();
        if fields.len() < MIN_FIELDS {
            return Err(RecordError::MissingFields(fields.len()));
        }

        let name = fields[0];
        let umi = name
            .split(':')
            .nth(UMI_COMPONENT)
            .ok_or_else(|| RecordError::NoUmi(name.to_string()))?;

        let flag = lexical_core::parse::<u16>(fields[1].as_bytes())
            .map_err(|_| RecordError::InvalidFlag(fields[1].to_string()))?;
        let position = lexical_core::parse::<u32>(fields[3].as_bytes())
            .ok()
            .filter(|&p| p <= MAX_POSITION)
            .ok_or_else(|| RecordError::InvalidPosition(fields[3].to_string()))?;

        Ok(Record {
            name: name.to_string(),
            umi: umi.to_string(),
            flag,
            reference: fields[2].to_string(),
            position,
            cigar: fields[5].to_string(),
            raw_line: line.to_string(),
        })
    }

    pub fn flags(&self) -> Flags {
        Flags::from(self.flag)
    }

    pub fn strand(&self) -> Strand {
        self.flags().into()
    }

    /// The 5′ start of the fragment this read was sequenced from.
    pub fn corrected_position(&self) -> Result<i64, RecordError> {
        let cigar: Cigar = self.cigar.parse()?;
        Ok(cigar.corrected_start(self.position, self.strand()))
    }

    pub fn fingerprint(&self) -> Result<Fingerprint, RecordError> {
        Ok(Fingerprint {
            umi: self.umi.clone(),
            reference: self.reference.clone(),
            strand: self.strand(),
            position: self.corrected_position()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn from_flag(flag: u16) -> Strand {
        Flags::from(flag).into()
    }
}

impl From<Flags> for Strand {
    fn from(flags: Flags) -> Strand {
        if flags.is_reverse_complemented() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

/// Identity of the molecule a read was sequenced from. Reads sharing a fingerprint are PCR
/// duplicates of each other.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Fingerprint {
    pub umi: String,
    pub reference: String,
    pub strand: Strand,
    pub position: i64,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RecordError {
    #[error("expected at least {MIN_FIELDS} tab separated fields, found {0}")]
    MissingFields(usize),
    #[error("no UMI in read name '{0}'")]
    NoUmi(String),
    #[error("invalid flag '{0}'")]
    InvalidFlag(String),
    #[error("invalid position '{0}'")]
    InvalidPosition(String),
    #[error("invalid CIGAR")]
    Cigar(#[from] CigarError),
}
