//! Newline-delimited record sources

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open request log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Open a request log for reading
pub async fn open_source(path: &Path) -> Result<File, SourceError> {
    File::open(path).await.map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Read records from a file, failing before anything is spawned if the file
/// can't be opened
pub async fn read_records_from_path(
    path: &Path,
    capacity: usize,
) -> Result<mpsc::Receiver<Vec<u8>>, SourceError> {
    let file = open_source(path).await?;
    debug!(path = %path.display(), "Opened request log");
    Ok(read_records(file, capacity))
}

/// Stream the lines of `reader` into a bounded queue
///
/// Every record is an owned copy of the line without its terminator. The
/// queue closes at end of input, on a read error, or when the receiver is
/// dropped.
pub fn read_records<R>(reader: R, capacity: usize) -> mpsc::Receiver<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut count = 0usize;

        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    trim_line_ending(&mut line);
                    if tx.send(line).await.is_err() {
                        debug!("Record consumer went away, stopping source");
                        break;
                    }
                    count += 1;
                }
                Err(e) => {
                    warn!(error = %e, records = count, "Read error, ending record stream");
                    break;
                }
            }
        }

        debug!(records = count, "Record source exhausted");
    });

    rx
}

/// Strip a trailing `\n` and then a trailing `\r`
fn trim_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
