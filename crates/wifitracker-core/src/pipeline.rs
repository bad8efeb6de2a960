//! Parallel request parsing
//!
//! ```text
//!                    ┌──► parser 0 ──► queue 0 ──┐
//! records ──► queue ─┼──► parser 1 ──► queue 1 ──┼──► merge ──► requests
//!                    └──► parser N ──► queue N ──┘
//! ```
//!
//! All queues are bounded, so a slow consumer holds back the parsers and,
//! through them, the record source. Malformed records are dropped by the
//! parser that picked them up. No ordering is kept across parsers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::request::{parse_request, Request};
use crate::source::read_records;

/// Default capacity of every queue in the pipeline
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Pipeline sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of parser workers, 0 means one per available CPU
    pub workers: usize,
    /// Capacity of each bounded queue
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Resolve the configured worker count
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

/// Run the full ingest pipeline on a byte stream
pub fn parse_requests<R>(reader: R, config: &PipelineConfig) -> mpsc::Receiver<Request>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    parse_records(read_records(reader, config.capacity()), config)
}

/// Fan records out to the parser pool and merge the results
pub fn parse_records(
    records: mpsc::Receiver<Vec<u8>>,
    config: &PipelineConfig,
) -> mpsc::Receiver<Request> {
    let workers = config.worker_count();
    debug!(workers, capacity = config.capacity(), "Starting parser pool");
    merge(
        spawn_parsers(records, workers, config.capacity()),
        config.capacity(),
    )
}

/// Start `workers` parsers sharing one input queue
///
/// Each parser gets its own output queue.
pub fn spawn_parsers(
    records: mpsc::Receiver<Vec<u8>>,
    workers: usize,
    capacity: usize,
) -> Vec<mpsc::Receiver<Request>> {
    let records = Arc::new(Mutex::new(records));
    (0..workers.max(1))
        .map(|worker| spawn_parser(worker, Arc::clone(&records), capacity))
        .collect()
}

fn spawn_parser(
    worker: usize,
    records: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
    capacity: usize,
) -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut parsed = 0usize;
        let mut dropped = 0usize;

        loop {
            // Lock is held only while waiting for the next record
            let record = records.lock().await.recv().await;
            let Some(record) = record else {
                break;
            };

            match parse_request(&record) {
                Ok(request) => {
                    if tx.send(request).await.is_err() {
                        break;
                    }
                    parsed += 1;
                }
                Err(e) => {
                    dropped += 1;
                    trace!(worker, error = %e, "Dropping malformed record");
                }
            }
        }

        debug!(worker, parsed, dropped, "Parser finished");
    });

    rx
}

/// Combine several queues into one
///
/// One forwarding task per input; the merged queue closes once every
/// forwarder has drained its input.
pub fn merge<T>(inputs: Vec<mpsc::Receiver<T>>, capacity: usize) -> mpsc::Receiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let mut forwarders = JoinSet::new();

    for mut input in inputs {
        let tx = tx.clone();
        forwarders.spawn(async move {
            let mut forwarded = 0usize;
            while let Some(item) = input.recv().await {
                if tx.send(item).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            forwarded
        });
    }

    tokio::spawn(async move {
        let mut total = 0usize;
        while let Some(result) = forwarders.join_next().await {
            match result {
                Ok(forwarded) => total += forwarded,
                Err(e) => warn!(error = %e, "Merge forwarder failed"),
            }
        }
        drop(tx);
        debug!(items = total, "Merged stream closed");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    fn record(i: usize) -> String {
        format!(
            r#"{{"source_mac":"mac-{i}","capture_dts":"2024-01-01 10:00:00.000000","target_ssid":"net","signal_strength":-40}}"#
        )
    }

    #[test]
    fn test_worker_count() {
        let config = PipelineConfig {
            workers: 3,
            queue_capacity: 10,
        };
        assert_eq!(config.worker_count(), 3);
        assert!(PipelineConfig::default().worker_count() >= 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let config = PipelineConfig {
            workers: 1,
            queue_capacity: 0,
        };
        assert_eq!(config.capacity(), 1);
    }

    #[tokio::test]
    async fn test_merge_delivers_everything_once() {
        let mut inputs = Vec::new();
        for source in 0..5 {
            let (tx, rx) = mpsc::channel(2);
            inputs.push(rx);
            tokio::spawn(async move {
                for i in 0..100 {
                    tx.send(source * 1000 + i).await.unwrap();
                }
            });
        }

        let mut merged = collect(merge(inputs, 3)).await;
        merged.sort_unstable();

        let mut expected: Vec<i32> = (0..5)
            .flat_map(|source| (0..100).map(move |i| source * 1000 + i))
            .collect();
        expected.sort_unstable();
        assert_eq!(merged, expected);
    }

    #[tokio::test]
    async fn test_merge_no_inputs_closes() {
        let merged: Vec<u8> = collect(merge(Vec::new(), 1)).await;
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_parsers_drop_malformed() {
        let mut lines: Vec<String> = (0..50).map(record).collect();
        lines.insert(10, "garbage".to_string());
        lines.insert(20, String::new());
        lines.insert(
            30,
            r#"{"source_mac":"x","capture_dts":"2024-01-01 10:00:00"}"#.to_string(),
        );
        let input = lines.join("\n").into_bytes();

        let config = PipelineConfig {
            workers: 4,
            queue_capacity: 2,
        };
        let requests = collect(parse_requests(std::io::Cursor::new(input), &config)).await;
        assert_eq!(requests.len(), 50);
    }

    #[tokio::test]
    async fn test_each_record_parsed_once() {
        let input = (0..200).map(record).collect::<Vec<_>>().join("\n").into_bytes();
        let config = PipelineConfig {
            workers: 8,
            queue_capacity: 1,
        };

        let mut macs: Vec<String> = collect(parse_requests(std::io::Cursor::new(input), &config))
            .await
            .into_iter()
            .map(|r| r.source_mac)
            .collect();
        macs.sort();
        macs.dedup();
        assert_eq!(macs.len(), 200);
    }
}
