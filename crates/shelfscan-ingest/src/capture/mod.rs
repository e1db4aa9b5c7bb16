//! Live barcode capture: one camera frame per cycle, decoded, normalized and
//! catalogued.

pub mod command;

use std::time::Duration;

use serde::Serialize;

use crate::catalogue::{Cataloguer, StoreOutcome};
use crate::error::Result;
use crate::identifiers::Isbn;

pub use command::{CommandFrameSource, ZbarDecoder};

/// Raw encoded image bytes (PNG) as produced by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(pub Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

pub trait FrameSource: Send + Sync {
    fn read_frame(&self) -> Result<Frame>;
}

/// Maps a frame to zero or more decoded barcode payloads.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Result<Vec<String>>;
}

/// Checked once per cycle in continuous mode.
pub trait CancelSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Idle,
    Detected,
    Stored,
}

/// State of a single capture cycle. Never carried over to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureCycle {
    pub state: CaptureState,
    pub last_isbn: Option<String>,
    pub debounced: bool,
    pub outcome: Option<StoreOutcome>,
}

impl CaptureCycle {
    fn idle() -> Self {
        Self {
            state: CaptureState::Idle,
            last_isbn: None,
            debounced: false,
            outcome: None,
        }
    }

    /// The ISBN this cycle confirmed, if it reached `Stored`.
    pub fn confirmed_isbn(&self) -> Option<&str> {
        match self.state {
            CaptureState::Stored => self.last_isbn.as_deref(),
            _ => None,
        }
    }
}

pub struct LiveCapture {
    source: Box<dyn FrameSource>,
    decoder: Box<dyn BarcodeDecoder>,
    cataloguer: Cataloguer,
    source_label: String,
    interval: Duration,
}

impl LiveCapture {
    pub fn new(
        source: Box<dyn FrameSource>,
        decoder: Box<dyn BarcodeDecoder>,
        cataloguer: Cataloguer,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            source,
            decoder,
            cataloguer,
            source_label: source_label.into(),
            interval: Duration::from_secs(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs one cycle over an already acquired frame.
    pub async fn run_cycle(&self, frame: &Frame) -> Result<CaptureCycle> {
        let mut cycle = CaptureCycle::idle();

        for payload in self.decoder.decode(frame)? {
            let isbn = match Isbn::parse(&payload) {
                Ok(isbn) => isbn,
                Err(err) => {
                    tracing::debug!(payload = %payload, "ignoring barcode: {err}");
                    continue;
                }
            };
            cycle.state = CaptureState::Detected;
            cycle.last_isbn = Some(isbn.isbn13.clone());
            cycle.debounced = true;

            match self.cataloguer.catalogue(&isbn.isbn13, &self.source_label).await {
                Ok(outcome) => {
                    cycle.state = CaptureState::Stored;
                    cycle.outcome = Some(outcome);
                }
                Err(err) => tracing::error!(isbn = %isbn, "failed to store captured book: {err}"),
            }
            break;
        }

        Ok(cycle)
    }

    /// Processes exactly one frame.
    pub async fn single_shot(&self) -> Result<CaptureCycle> {
        let frame = self.source.read_frame()?;
        self.run_cycle(&frame).await
    }

    /// Loops until `cancel` fires, returning the last ISBN confirmed by any cycle.
    pub async fn continuous(&self, cancel: &dyn CancelSignal) -> Option<String> {
        let mut last_confirmed = None;

        while !cancel.is_cancelled() {
            let frame = self.source.read_frame();
            tokio::time::sleep(self.interval).await;

            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!("frame capture failed: {err}");
                    continue;
                }
            };
            match self.run_cycle(&frame).await {
                Ok(cycle) => {
                    if let Some(isbn) = cycle.confirmed_isbn() {
                        last_confirmed = Some(isbn.to_string());
                    }
                }
                Err(err) => tracing::warn!("barcode decoding failed: {err}"),
            }
        }

        last_confirmed
    }
}
