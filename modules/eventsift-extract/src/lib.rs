pub mod dates;
pub mod error;
pub mod fetcher;
pub mod geo;
pub mod heuristic;
pub mod html;
pub mod mapper;
pub mod normalizer;
pub mod orchestrator;
pub mod pipeline;
pub mod places;
pub mod prompt;
pub mod sink;
pub mod strict;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod verifier;

pub use error::{ExtractError, NormalizeError};
pub use normalizer::{NormalizeBatch, Normalizer};
pub use orchestrator::{ExtractionRequest, Orchestrator, OrchestratorOptions};
pub use pipeline::{ExtractionOutput, IngestReport, Pipeline};
pub use sink::{EventSink, MemorySink, UpsertSummary};
pub use strict::{StrictDateExtractor, StrictLocationExtractor};
pub use tags::TagExtractor;
pub use verifier::{Verifier, VerifyOptions};
