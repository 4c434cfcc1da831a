//! File replay feed source.
//!
//! Streams a captured JSONL feed through the parser onto the ordered event
//! queue, one frame per line, preserving arrival order. Unparseable frames
//! are dropped with a warning; the stream keeps going.
//!
//! Resnapshot requests are served by re-emitting the most recent snapshot
//! frame, which is what a live feed does after a resubscribe. The run ends
//! when the file is exhausted or the consumer goes away.

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use dmm_feed::{FeedCommand, FeedEvent, MessageParser};
use dmm_telemetry::Metrics;

use crate::error::AppResult;

/// Replays a captured feed file into the engine.
pub struct ReplayFeed {
    path: String,
    delay_ms: u64,
    parser: MessageParser,
}

impl ReplayFeed {
    pub fn new(path: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            path: path.into(),
            delay_ms,
            parser: MessageParser::new(),
        }
    }

    /// Stream the file onto `events`, serving `commands` between frames.
    pub async fn run(
        self,
        events: mpsc::Sender<FeedEvent>,
        mut commands: mpsc::Receiver<FeedCommand>,
    ) -> AppResult<()> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) => {
                error!(path = %self.path, error = %e, "failed to open replay file");
                return Err(e.into());
            }
        };
        let mut lines = BufReader::new(file).lines();
        let mut last_snapshot: Option<FeedEvent> = None;
        let mut frames: u64 = 0;
        let mut dropped: u64 = 0;

        info!(path = %self.path, delay_ms = self.delay_ms, "starting replay");

        loop {
            tokio::select! {
                // Commands take priority so a gapped book recovers before
                // further diffs pile up behind it.
                biased;

                maybe_cmd = commands.recv() => {
                    match maybe_cmd {
                        Some(FeedCommand::Resnapshot { instrument }) => {
                            match &last_snapshot {
                                Some(snapshot) => {
                                    debug!(instrument = %instrument, "re-emitting last snapshot");
                                    if events.send(snapshot.clone()).await.is_err() {
                                        break;
                                    }
                                }
                                None => {
                                    warn!(instrument = %instrument, "resnapshot requested before any snapshot");
                                }
                            }
                        }
                        None => break,
                    }
                }

                maybe_line = lines.next_line() => {
                    match maybe_line? {
                        Some(line) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            frames += 1;
                            match self.parser.parse(&line) {
                                Ok(Some(event)) => {
                                    if matches!(event, FeedEvent::Snapshot { .. }) {
                                        last_snapshot = Some(event.clone());
                                    }
                                    if events.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    dropped += 1;
                                    Metrics::parse_failure();
                                    warn!(error = %e, "dropping unparseable frame");
                                }
                            }
                            if self.delay_ms > 0 {
                                sleep(Duration::from_millis(self.delay_ms)).await;
                            }
                        }
                        None => {
                            info!("replay exhausted");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            frames,
            dropped,
            malformed_levels = self.parser.stats().malformed_levels(),
            "replay finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmm_feed::FeedEvent;

    fn write_capture(name: &str, lines: &[&str]) -> String {
        let path = std::env::temp_dir().join(format!("dmm-{}-{}.jsonl", name, std::process::id()));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_replay_streams_events_in_order() {
        let path = write_capture(
            "order",
            &[
                r#"{"type":"snapshot","sequence_id":1,"bids":[[50000,100]],"asks":[[50010,100]]}"#,
                r#"{"type":"heartbeat"}"#,
                "not json",
                r#"{"type":"change","prev_sequence_id":1,"sequence_id":2,"bids":[["new",50001,50]],"asks":[]}"#,
                r#"{"type":"volatility","volatility":0.5,"timestamp":1,"index_name":"btc_usd"}"#,
            ],
        );

        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (_command_tx, command_rx) = mpsc::channel::<FeedCommand>(8);
        let feed = ReplayFeed::new(path.as_str(), 0);
        let join = tokio::spawn(feed.run(event_tx, command_rx));

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Snapshot { sequence_id: 1, .. }
        ));
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Diff { sequence_id: 2, .. }
        ));
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Volatility { .. }
        ));
        // Heartbeat ignored, bad frame dropped, file exhausted.
        assert!(event_rx.recv().await.is_none());

        join.await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_resnapshot_reemits_last_snapshot() {
        let path = write_capture(
            "resnap",
            &[
                r#"{"type":"snapshot","sequence_id":5,"bids":[[50000,100]],"asks":[[50010,100]]}"#,
                r#"{"type":"change","prev_sequence_id":5,"sequence_id":6,"bids":[],"asks":[["delete",50010,0]]}"#,
            ],
        );

        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (command_tx, command_rx) = mpsc::channel(8);
        // The inter-frame delay keeps the feed alive while the command is sent.
        let feed = ReplayFeed::new(path.as_str(), 50);
        let join = tokio::spawn(feed.run(event_tx, command_rx));

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Snapshot { sequence_id: 5, .. }
        ));
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Diff { sequence_id: 6, .. }
        ));

        command_tx
            .send(FeedCommand::Resnapshot {
                instrument: "BTC-PERPETUAL".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            event_rx.recv().await.unwrap(),
            FeedEvent::Snapshot { sequence_id: 5, .. }
        ));
        assert!(event_rx.recv().await.is_none());

        join.await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let (event_tx, _event_rx) = mpsc::channel(1);
        let (_command_tx, command_rx) = mpsc::channel::<FeedCommand>(1);
        let feed = ReplayFeed::new("/nonexistent/capture.jsonl", 0);
        assert!(feed.run(event_tx, command_rx).await.is_err());
    }
}
