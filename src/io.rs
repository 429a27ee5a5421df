use std::marker::Unpin;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{
    self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};

use crate::markdups::KnownUmis;

/// Path value meaning stdin for input and stdout for output.
pub const STDIO: &str = "-";

/// SamIo is created from an `AsyncRead` and an `AsyncWrite`. It hands out the input one line
/// at a time and writes lines back unchanged. Input order is output order; nothing is
/// buffered beyond the underlying `BufReader`/`BufWriter`.
pub struct SamIo<R, W>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    in_sam: BufReader<R>,
    out_sam: BufWriter<W>,
    line: String,
    line_number: usize,
}

impl<R, W> SamIo<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(read: R, write: W) -> SamIo<R, W> {
        SamIo {
            in_sam: BufReader::new(read),
            out_sam: BufWriter::new(write),
            line: String::new(),
            line_number: 0,
        }
    }

    /// Read the next line, trailing newline included. Returns an empty string once the input
    /// is exhausted.
    pub async fn read_line(&mut self) -> io::Result<&str> {
        self.line.clear();
        if self.in_sam.read_line(&mut self.line).await? > 0 {
            self.line_number += 1;
        }
        Ok(&self.line)
    }

    /// 1-based number of the line last returned by `read_line`.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.out_sam.write_all(line.as_bytes()).await?;
        self.out_sam.write_all(b"\n").await
    }

    /// Flush buffered output and shut the writer down.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.out_sam.shutdown().await
    }

    pub fn into_writer(self) -> W {
        self.out_sam.into_inner()
    }
}

pub async fn open_input(path: &Path) -> Result<Box<dyn AsyncRead + Unpin>, SamIoError> {
    if path.as_os_str() == STDIO {
        Ok(Box::new(io::stdin()))
    } else {
        let file = File::open(path).await.map_err(|e| SamIoError::missing(path, e))?;
        Ok(Box::new(file))
    }
}

pub async fn open_output(path: &Path) -> Result<Box<dyn AsyncWrite + Unpin>, SamIoError> {
    if path.as_os_str() == STDIO {
        Ok(Box::new(io::stdout()))
    } else {
        let file = File::create(path).await.map_err(|e| SamIoError::missing(path, e))?;
        Ok(Box::new(file))
    }
}

/// Load the UMI whitelist: one UMI per line, surrounding whitespace ignored, blank lines
/// skipped.
pub async fn load_known_umis(path: &Path) -> Result<KnownUmis, SamIoError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SamIoError::missing(path, e))?;
    Ok(parse_known_umis(&text))
}

pub fn parse_known_umis(text: &str) -> KnownUmis {
    text.lines()
        .map(str::trim)
        .filter(|umi| !umi.is_empty())
        .collect()
}

#[derive(Debug, Error)]
pub enum SamIoError {
    #[error("cannot open '{}'", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SamIoError {
    fn missing(path: &Path, source: std::io::Error) -> SamIoError {
        SamIoError::MissingFile { path: path.to_path_buf(), source }
    }
}
