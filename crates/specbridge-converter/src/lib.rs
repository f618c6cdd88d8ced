//! Format-to-format conversion for API description documents.
//!
//! A [`Converter`] owns a fixed registry of parsers and writers keyed by
//! [`Format`] and runs one document per call through read, detect, parse,
//! an optional transform, optional validation and write. Calls observe a
//! [`CancelToken`] between 64 KiB chunks and report byte progress through
//! the [`Context`].
//!
//! ```ignore
//! use specbridge_converter::{Context, ConvertOptions, Converter, Format};
//!
//! let converter = Converter::default();
//! let report = converter.convert(
//!     &Context::new(),
//!     &mut input,
//!     &mut output,
//!     None,
//!     Format::Blueprint,
//!     &ConvertOptions::new().with_validate(true),
//! )?;
//! ```

pub mod buffer;
pub mod context;
pub mod converter;
pub mod error;
pub mod options;
pub mod stream;

pub use buffer::{BufferPool, PooledBuffer};
pub use context::{CancelToken, Context, ProgressFn};
pub use converter::{
    detect_format, ConvertReport, Converter, ConverterBuilder, Transform, ValidationReport,
};
pub use error::{ConvertError, ErrorKind};
pub use options::ConvertOptions;
pub use stream::CHUNK_SIZE;

pub use specbridge_formats::{
    Adapter, AsyncApiVersion, Encoding, Format, OpenApiVersion, WriteOptions,
};
pub use specbridge_model::{Api, Warning};
pub use specbridge_validator::{Rule, Severity, ValidationError, Validator};
