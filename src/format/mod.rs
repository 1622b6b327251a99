//! Annotation format support: codecs, the registry, and import/export
//! orchestration.

pub mod codecs;
pub mod error;
pub mod io;
pub mod registry;
pub mod traits;

pub use codecs::{CsvCodec, JsonCodec, PascalVocCodec, YoloCodec};
pub use error::FormatError;
pub use io::{
    ExportOutcome, ImportOptions, ImportOutcome, OperationReport, OperationType,
    export_annotations, import_annotations,
};
pub use registry::CodecRegistry;
pub use traits::{AnnotationCodec, CancelFlag, DecodedBatch, EncodedBatch, ErrorEntry};
