//! Replay of recorded socket transitions
//!
//! Captures are stored as JSON lines, one [`SocketTransition`] per line.
//! Blank lines and lines starting with `#` are skipped.

use crate::{
    error::{Error, Result},
    monitor::{DEFAULT_CHANNEL_CAPACITY, Monitor},
    shutdown::ShutdownSignal,
    transition::SocketTransition,
};
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Where replayed transitions come from
#[derive(Debug, Clone)]
enum ReplaySource {
    Records(Vec<SocketTransition>),
    File(PathBuf),
}

/// A monitor that plays back previously recorded transitions
#[derive(Debug)]
pub struct ReplayMonitor {
    source: ReplaySource,
    interval: Option<Duration>,
    hold_open: bool,
    capacity: usize,
    started: AtomicBool,
}

impl ReplayMonitor {
    /// Replay transitions held in memory
    pub fn from_records(records: Vec<SocketTransition>) -> Self {
        Self::with_source(ReplaySource::Records(records))
    }

    /// Replay transitions from a JSON-lines capture file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(ReplaySource::File(path.into()))
    }

    fn with_source(source: ReplaySource) -> Self {
        Self {
            source,
            interval: None,
            hold_open: false,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            started: AtomicBool::new(false),
        }
    }

    /// Pause between transitions
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Keep the stream open after the last record until shutdown fires
    pub fn hold_open(mut self, hold_open: bool) -> Self {
        self.hold_open = hold_open;
        self
    }

    /// Capacity of the output channel
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    async fn load(&self) -> Result<Vec<SocketTransition>> {
        match &self.source {
            ReplaySource::Records(records) => Ok(records.clone()),
            ReplaySource::File(path) => {
                let contents = async_fs::read_to_string(path).await?;
                let records = parse_lines(&contents)?;
                info!("Loaded {} transitions from {:?}", records.len(), path);
                Ok(records)
            }
        }
    }
}

/// Decode a JSON-lines capture
pub fn parse_lines(contents: &str) -> Result<Vec<SocketTransition>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| Error::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

#[async_trait]
impl Monitor for ReplayMonitor {
    async fn start(&self, done: ShutdownSignal) -> Result<Receiver<SocketTransition>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let records = self.load().await?;
        let (tx, rx) = async_channel::bounded(self.capacity);
        let interval = self.interval;
        let hold_open = self.hold_open;

        std::thread::Builder::new()
            .name("socket-replay".to_string())
            .spawn(move || produce(records, tx, done, interval, hold_open))?;

        Ok(rx)
    }
}

fn produce(
    records: Vec<SocketTransition>,
    tx: Sender<SocketTransition>,
    done: ShutdownSignal,
    interval: Option<Duration>,
    hold_open: bool,
) {
    let total = records.len();
    for (sent, record) in records.into_iter().enumerate() {
        if done.is_triggered() {
            debug!("Replay stopped after {}/{} transitions", sent, total);
            return;
        }
        if tx.send_blocking(record).is_err() {
            debug!("Replay consumer went away after {}/{} transitions", sent, total);
            return;
        }
        if let Some(interval) = interval {
            std::thread::sleep(interval);
        }
    }

    if hold_open {
        futures::executor::block_on(done.wait());
    }
    debug!("Replay finished, closing stream");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let contents = r#"
# captured on build-host
{"pid":1,"comm":"sshd","protocol":"tcp","src_addr":"0.0.0.0","src_port":22,"dst_addr":"0.0.0.0","dst_port":0,"old_state":"CLOSE","new_state":"LISTEN"}

{"pid":1,"comm":"sshd","protocol":"tcp","src_addr":"0.0.0.0","src_port":22,"dst_addr":"0.0.0.0","dst_port":0,"old_state":"LISTEN","new_state":"CLOSE"}
"#;
        let records = parse_lines(contents).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_listen());
        assert!(records[1].is_unlisten());
    }

    #[test]
    fn test_parse_reports_line_number() {
        let contents = "# header\nnot json\n";
        match parse_lines(contents) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
