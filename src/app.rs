use std::marker::Unpin;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::{
    io::{load_known_umis, open_input, open_output, SamIo, SamIoError},
    markdups::{DuplicateIndex, KnownUmis, MarkResult},
    metrics::{Metrics, Status},
    record::{Record, RecordError, SamLine},
};

const PROGRESS_INTERVAL: usize = 1_000_000;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// The input SAM file, sorted by reference and position. Use `-` to read from stdin
    #[clap(short = 'f', long = "file", value_name = "SAM")]
    pub input: PathBuf,

    /// The deduplicated output SAM file. Use `-` to write to stdout
    #[clap(short = 'o', long = "outfile", value_name = "SAM")]
    pub output: PathBuf,

    /// File with the known UMI sequences, one per line.
    /// Reads with any other UMI are dropped
    #[clap(short = 'u', long = "umi", value_name = "FILE")]
    pub umis: PathBuf,

    /// The metrics file, if missing metrics will be written to stderr
    #[clap(short = 'm', long)]
    pub metrics: Option<PathBuf>,

    /// Log debug messages. RUST_LOG takes precedence when set
    #[clap(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Streaming,
    Done,
}

pub struct App<R, W>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    samio: SamIo<R, W>,
    known_umis: KnownUmis,
    index: DuplicateIndex,
    metrics: Metrics,
    state: State,
}

impl App<Box<dyn AsyncRead + Unpin>, Box<dyn AsyncWrite + Unpin>> {
    /// Open every file named in `config`. All of them are checked before the output is
    /// created, so a bad path leaves nothing behind.
    pub async fn new(config: &Config) -> Result<Self, DedupError> {
        let known_umis = load_known_umis(&config.umis).await?;
        info!("loaded {} known UMIs from {}", known_umis.len(), config.umis.display());

        let read = open_input(&config.input).await?;
        let write = open_output(&config.output).await?;

        Ok(App::with_io(SamIo::new(read, write), known_umis))
    }
}

impl<R, W> App<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn with_io(samio: SamIo<R, W>, known_umis: KnownUmis) -> App<R, W> {
        App {
            samio,
            known_umis,
            index: DuplicateIndex::new(),
            metrics: Metrics::default(),
            state: State::Streaming,
        }
    }

    /// Deduplication is a single pass in input order. Headers are copied, the first read of
    /// every fingerprint is copied, everything else is dropped. The input must be sorted so
    /// that the output stays sorted; the decision itself does not depend on it.
    pub async fn run(&mut self) -> Result<&Metrics, DedupError> {
        while self.state == State::Streaming {
            self.state = self.step().await?;
        }
        self.samio.shutdown().await?;

        info!(
            "processed {} lines: wrote {} of {} reads, {} duplicates, {} with an unknown UMI",
            self.metrics.lines_processed(),
            self.metrics.reads_written(),
            self.metrics.reads_examined(),
            self.metrics.duplicate_reads(),
            self.metrics.unknown_umi_count(),
        );
        debug!(
            "{} header lines copied, {} distinct fingerprints indexed",
            self.metrics.header_lines(),
            self.index.len()
        );

        Ok(&self.metrics)
    }

    pub fn into_writer(self) -> W {
        self.samio.into_writer()
    }

    async fn step(&mut self) -> Result<State, DedupError> {
        let line = self.samio.read_line().await?;
        let parsed = SamLine::parse(line).map_err(|source| (source, line.trim_end().to_string()));
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err((source, line)) => return Err(self.malformed(line, source)),
        };

        match parsed {
            SamLine::EndOfStream => return Ok(State::Done),
            SamLine::Header(header) => {
                self.samio.write_line(&header).await?;
                self.metrics.count(Status::Header);
            }
            SamLine::Alignment(record) => {
                let result = self.mark(&record)?;
                if result == MarkResult::Unique {
                    self.samio.write_line(&record.raw_line).await?;
                }
                self.metrics.count(result.into());

                let examined = self.metrics.reads_examined();
                if examined % PROGRESS_INTERVAL == 0 {
                    debug!(
                        "examined {} reads, last at {}:{}",
                        examined, record.reference, record.position
                    );
                }
            }
        }

        Ok(State::Streaming)
    }

    fn mark(&mut self, record: &Record) -> Result<MarkResult, DedupError> {
        if !self.known_umis.contains(&record.umi) {
            debug!("unknown UMI {} in {}", record.umi, record.name);
            return Ok(MarkResult::UnknownUmi);
        }

        let fingerprint = record
            .fingerprint()
            .map_err(|source| self.malformed(record.raw_line.clone(), source))?;
        Ok(self.index.mark(fingerprint))
    }

    fn malformed(&self, line: String, source: RecordError) -> DedupError {
        DedupError::MalformedRecord { line_number: self.samio.line_number(), line, source }
    }
}

/// Write the metrics table to `path`, or to stderr when no path is given.
pub fn report(metrics: &Metrics, path: Option<&Path>) -> Result<(), DedupError> {
    // print/write the metrics (sync)
    if let Some(path) = path {
        use std::io::Write;
        let mut mout = std::fs::File::create(path)?;
        write!(mout, "{}", metrics)?;
    } else {
        eprint!("{}", metrics);
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    SamIoError(#[from] SamIoError),
    #[error("malformed record on line {line_number}: {line}")]
    MalformedRecord {
        line_number: usize,
        line: String,
        #[source]
        source: RecordError,
    },
}
