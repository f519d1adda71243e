use std::io::Write;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use super::event_types::should_flush_immediately;
use super::BusEvent;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BATCH: usize = 50;

/// Destination for batched bus events.
pub trait BatchSink: Send + 'static {
    fn emit(&mut self, batch: &[BusEvent]);
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W: Write + Send + 'static> {
    writer: W,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send + 'static> BatchSink for JsonLinesSink<W> {
    fn emit(&mut self, batch: &[BusEvent]) {
        for event in batch {
            let line = match serde_json::to_string(event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("failed to serialize bus event {}: {e}", event.seq);
                    continue;
                }
            };
            if let Err(e) = writeln!(self.writer, "{line}") {
                tracing::warn!("failed to write event batch to sink: {e}");
                return;
            }
        }
        if let Err(e) = self.writer.flush() {
            tracing::warn!("failed to flush event sink: {e}");
        }
    }
}

pub struct EventBatcher;

impl EventBatcher {
    /// Spawn a background task that batches events and hands them to `sink`.
    ///
    /// - "Immediate" events (feed status and alerts) are flushed instantly
    ///   as a single-element batch, after anything already buffered.
    /// - All other events are buffered and flushed every 100ms or when the
    ///   buffer reaches 50 events.
    pub fn start<S: BatchSink>(mut rx: broadcast::Receiver<BusEvent>, mut sink: S) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buffer: Vec<BusEvent> = Vec::with_capacity(DEFAULT_MAX_BATCH);
            let mut interval = time::interval(DEFAULT_FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                if should_flush_immediately(&event) {
                                    // Flush buffer first so ordering is preserved
                                    if !buffer.is_empty() {
                                        flush(&mut sink, &mut buffer);
                                    }
                                    sink.emit(std::slice::from_ref(&event));
                                } else {
                                    buffer.push(event);
                                    if buffer.len() >= DEFAULT_MAX_BATCH {
                                        flush(&mut sink, &mut buffer);
                                    }
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!("event batcher lagged, dropped {n} events");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                // Bus shut down: flush remainder and exit.
                                if !buffer.is_empty() {
                                    flush(&mut sink, &mut buffer);
                                }
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => {
                        if !buffer.is_empty() {
                            flush(&mut sink, &mut buffer);
                        }
                    }
                }
            }
        })
    }
}

fn flush<S: BatchSink>(sink: &mut S, buffer: &mut Vec<BusEvent>) {
    sink.emit(buffer);
    buffer.clear();
}
