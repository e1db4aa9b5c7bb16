//! shelfscan ingest: ISBN discovery in book files and camera frames,
//! metadata resolution and cataloguing.

pub mod capture;
pub mod catalogue;
pub mod error;
pub mod extract;
pub mod http;
pub mod identifiers;
pub mod pipeline;
pub mod refresh;
pub mod sources;

pub use capture::{
    BarcodeDecoder, CancelSignal, CaptureCycle, CaptureState, CommandFrameSource, Frame,
    FrameSource, LiveCapture, ZbarDecoder,
};
pub use catalogue::{Cataloguer, StoreOutcome};
pub use error::{IngestError, Result};
pub use extract::{DocumentFormat, ExtractorSet, TextExtractor};
pub use identifiers::{Isbn, IsbnKind, normalize};
pub use pipeline::{BatchOutcome, BatchPipeline, FormatCounts, RunSummary};
pub use refresh::{RefreshSummary, refresh_bare_records};
pub use sources::{MetadataResolver, NoMetadata, OpenLibrarySource};
