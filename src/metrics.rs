use std::fmt;

use crate::markdups::MarkResult;

/// Deduplication metrics.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Metrics {
    lines_processed: usize,
    header_lines: usize,
    unique_reads: usize,
    duplicate_reads: usize,
    unknown_umi_reads: usize,
}

pub enum Status {
    Header,
    Unique,
    Duplicate,
    UnknownUmi,
}

impl From<MarkResult> for Status {
    fn from(result: MarkResult) -> Status {
        match result {
            MarkResult::Unique => Status::Unique,
            MarkResult::Duplicate => Status::Duplicate,
            MarkResult::UnknownUmi => Status::UnknownUmi,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LINES_PROCESSED\tHEADER_LINES\tREADS_EXAMINED\tREADS_WRITTEN\tDUPLICATE_READS\tUNKNOWN_UMI_READS\tPERCENT_DUPLICATION")?;
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.6}",
            self.lines_processed,
            self.header_lines,
            self.reads_examined(),
            self.reads_written(),
            self.duplicate_reads,
            self.unknown_umi_reads,
            self.percent_duplication()
        )
    }
}

impl Metrics {
    pub fn lines_processed(&self) -> usize {
        self.lines_processed
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    /// Alignment lines seen, whatever their fate.
    pub fn reads_examined(&self) -> usize {
        self.unique_reads + self.duplicate_reads + self.unknown_umi_reads
    }

    pub fn reads_written(&self) -> usize {
        self.unique_reads
    }

    pub fn duplicate_reads(&self) -> usize {
        self.duplicate_reads
    }

    pub fn unknown_umi_count(&self) -> usize {
        self.unknown_umi_reads
    }

    /// Fraction of reads with a known UMI that were dropped as duplicates.
    pub fn percent_duplication(&self) -> f64 {
        let eligible = self.unique_reads + self.duplicate_reads;
        if eligible == 0 {
            0.0
        } else {
            self.duplicate_reads as f64 / eligible as f64
        }
    }

    pub fn count(&mut self, status: Status) {
        self.count_many(status, 1);
    }

    pub fn count_many(&mut self, status: Status, count: usize) {
        self.lines_processed += count;
        match status {
            Status::Header => self.header_lines += count,
            Status::Unique => self.unique_reads += count,
            Status::Duplicate => self.duplicate_reads += count,
            Status::UnknownUmi => self.unknown_umi_reads += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let mut m = Metrics::default();
        m.count_many(Status::Header, 3);
        m.count_many(Status::Unique, 6);
        m.count_many(Status::Duplicate, 2);
        m.count(Status::UnknownUmi);

        assert_eq!(m.lines_processed(), 12);
        assert_eq!(m.header_lines(), 3);
        assert_eq!(m.reads_examined(), 9);
        assert_eq!(m.reads_written(), 6);
        assert_eq!(m.duplicate_reads(), 2);
        assert_eq!(m.unknown_umi_count(), 1);
        assert!((m.percent_duplication() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run() {
        let m = Metrics::default();
        assert_eq!(m.percent_duplication(), 0.0);
        let table = m.to_string();
        let rows: Vec<_> = table.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "0\t0\t0\t0\t0\t0\t0.000000");
    }
}
