pub mod checkpoint;
pub mod damage;
pub mod dataset_writer;
pub mod extractor;
pub mod normalizer;
pub mod persistence;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use dataset_writer::DatasetWriter;
pub use extractor::{ChromiumExtractor, PageExtractor};
pub use normalizer::Normalizer;
pub use persistence::{RecordSink, SqliteSink, UpsertOutcome};
