//! The conversion pipeline: read, detect, parse, transform, validate, write.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use serde::Serialize;
use specbridge_formats::{Adapter, Format};
use specbridge_model::{Api, Warning};
use specbridge_telemetry::{
    log_adapter_warning, log_cancelled, log_conversion_completed, log_conversion_failed,
    log_format_detected, log_validation_failure,
};
use specbridge_validator::{has_errors, ValidationError, Validator};
use tracing::{debug, info_span};

use crate::buffer::BufferPool;
use crate::context::Context;
use crate::error::ConvertError;
use crate::options::ConvertOptions;
use crate::stream::{read_chunked, write_chunked};

/// A pure rewrite of the IR between parse and validation.
pub type Transform = Box<dyn Fn(Api) -> Api + Send + Sync>;

/// Summary of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub from: Format,
    pub to: Format,
    /// Parse warnings followed by write warnings.
    pub warnings: Vec<Warning>,
    /// Warning-level validation findings (empty unless validation ran).
    pub validation: Vec<ValidationError>,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Result of validating a document without converting it.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub format: Format,
    pub results: Vec<ValidationError>,
    /// Warnings raised while parsing.
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        !has_errors(&self.results)
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// Builds a [`Converter`]. The registry is fixed once built.
#[derive(Default)]
pub struct ConverterBuilder {
    parsers: HashMap<Format, Adapter>,
    writers: HashMap<Format, Adapter>,
    transform: Option<Transform>,
    validator: Option<Validator>,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` as the parser for its format, replacing any other.
    pub fn register_parser(mut self, adapter: Adapter) -> Self {
        self.parsers.insert(adapter.format(), adapter);
        self
    }

    /// Register `adapter` as the writer for its format, replacing any other.
    pub fn register_writer(mut self, adapter: Adapter) -> Self {
        self.writers.insert(adapter.format(), adapter);
        self
    }

    /// Parsers and writers for every supported format.
    pub fn with_builtin_adapters(mut self) -> Self {
        for format in Format::ALL {
            self = self
                .register_parser(Adapter::for_format(format))
                .register_writer(Adapter::for_format(format));
        }
        self
    }

    pub fn with_transform(mut self, transform: impl Fn(Api) -> Api + Send + Sync + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Replace the default rule set.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Converter {
        Converter {
            parsers: self.parsers,
            writers: self.writers,
            transform: self.transform,
            validator: self.validator.unwrap_or_default(),
            buffers: BufferPool::new(),
        }
    }
}

/// Converts API description documents between formats.
///
/// Safe to share across threads; each call keeps its own state.
pub struct Converter {
    parsers: HashMap<Format, Adapter>,
    writers: HashMap<Format, Adapter>,
    transform: Option<Transform>,
    validator: Validator,
    buffers: BufferPool,
}

impl Default for Converter {
    /// A converter with all built-in adapters and validation rules.
    fn default() -> Self {
        Self::builder().with_builtin_adapters().build()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parsers: Vec<Format> = self.parsers.keys().copied().collect();
        parsers.sort_by_key(|format| format.as_str());
        let mut writers: Vec<Format> = self.writers.keys().copied().collect();
        writers.sort_by_key(|format| format.as_str());
        f.debug_struct("Converter")
            .field("parsers", &parsers)
            .field("writers", &writers)
            .field("transform", &self.transform.is_some())
            .field("validator", &self.validator)
            .finish()
    }
}

impl Converter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    pub fn supports_parse(&self, format: Format) -> bool {
        self.parsers.contains_key(&format)
    }

    pub fn supports_write(&self, format: Format) -> bool {
        self.writers.contains_key(&format)
    }

    /// Convert the document read from `input` into `to`, writing it to
    /// `output`. With `from` unset the input format is detected.
    ///
    /// Nothing reaches `output` unless every earlier step succeeded.
    pub fn convert(
        &self,
        ctx: &Context,
        input: &mut dyn Read,
        output: &mut dyn Write,
        from: Option<Format>,
        to: Format,
        options: &ConvertOptions,
    ) -> Result<ConvertReport, ConvertError> {
        let span = info_span!("convert", to = %to);
        let _enter = span.enter();

        let result = self.run_convert(ctx, input, output, from, to, options);
        match &result {
            Ok(report) => log_conversion_completed!(
                from = %report.from,
                to = %report.to,
                warnings = report.warnings.len(),
                bytes_read = report.bytes_read,
                bytes_written = report.bytes_written,
                "conversion completed"
            ),
            Err(ConvertError::Cancelled) => log_cancelled!(operation = "convert", "conversion cancelled"),
            Err(e) => log_conversion_failed!(error = %e, "conversion failed"),
        }
        result
    }

    fn run_convert(
        &self,
        ctx: &Context,
        input: &mut dyn Read,
        output: &mut dyn Write,
        from: Option<Format>,
        to: Format,
        options: &ConvertOptions,
    ) -> Result<ConvertReport, ConvertError> {
        if let Some(format) = from {
            self.parser(format)?;
        }
        ctx.check()?;

        let mut meter = ctx.meter();
        let mut source = Vec::new();
        let bytes_read = read_chunked(ctx, &mut meter, input, &mut source)?;
        let (from, api, mut warnings) = self.parse_bytes(ctx, &source, from)?;
        drop(source);

        let api = match &self.transform {
            Some(transform) => {
                debug!("applying transform");
                transform(api)
            }
            None => api,
        };

        let mut validation = Vec::new();
        if options.validate {
            ctx.check()?;
            let results = self.validator.run(&api, options.stop_on_first_error);
            if has_errors(&results) {
                log_validation_failure!(
                    errors = results.iter().filter(|r| r.is_error()).count(),
                    "validation failed"
                );
                return Err(ConvertError::Validation(results));
            }
            validation = results;
        }

        ctx.check()?;
        let writer = self.writer(to)?;
        let mut rendered = self.buffers.acquire();
        let write_warnings = writer
            .write(&api, &options.write, &mut rendered)
            .map_err(|source| ConvertError::ConversionFailed {
                operation: "write",
                format: to,
                source,
            })?;
        report_warnings(&write_warnings);
        warnings.extend(write_warnings);

        if options.strict {
            let mut collected = warnings.clone();
            collected.extend(validation.iter().map(|v| {
                let warning = Warning::new(&v.code, v.message.clone());
                match &v.location {
                    Some(location) => warning.at(location.clone()),
                    None => warning,
                }
            }));
            if !collected.is_empty() {
                return Err(ConvertError::Strict(collected));
            }
        }

        let bytes_written = write_chunked(ctx, &mut meter, output, &rendered)?;

        Ok(ConvertReport {
            from,
            to,
            warnings,
            validation,
            bytes_read,
            bytes_written,
        })
    }

    /// Parse and validate the document read from `input` without writing it.
    pub fn validate(
        &self,
        ctx: &Context,
        input: &mut dyn Read,
        format: Option<Format>,
    ) -> Result<ValidationReport, ConvertError> {
        let span = info_span!("validate");
        let _enter = span.enter();

        let result = self.run_validate(ctx, input, format);
        match &result {
            Ok(report) if !report.is_valid() => log_validation_failure!(
                format = %report.format,
                errors = report.error_count(),
                "document is invalid"
            ),
            Ok(_) => {}
            Err(ConvertError::Cancelled) => log_cancelled!(operation = "validate", "validation cancelled"),
            Err(e) => log_conversion_failed!(error = %e, "validation failed"),
        }
        result
    }

    fn run_validate(
        &self,
        ctx: &Context,
        input: &mut dyn Read,
        format: Option<Format>,
    ) -> Result<ValidationReport, ConvertError> {
        if let Some(format) = format {
            self.parser(format)?;
        }
        ctx.check()?;

        let mut meter = ctx.meter();
        let mut source = Vec::new();
        read_chunked(ctx, &mut meter, input, &mut source)?;
        let (format, api, warnings) = self.parse_bytes(ctx, &source, format)?;

        ctx.check()?;
        let results = self.validator.validate(&api);
        Ok(ValidationReport {
            format,
            results,
            warnings,
        })
    }

    /// Resolve the input format and parse `source` with its adapter.
    fn parse_bytes(
        &self,
        ctx: &Context,
        source: &[u8],
        from: Option<Format>,
    ) -> Result<(Format, Api, Vec<Warning>), ConvertError> {
        let from = match from {
            Some(format) => format,
            None => {
                let format = detect_format(source)?;
                log_format_detected!(format = %format, "detected input format");
                format
            }
        };
        let parser = self.parser(from)?;

        ctx.check()?;
        let parsed = parser
            .parse(source)
            .map_err(|source| ConvertError::Parse { format: from, source })?;
        report_warnings(&parsed.warnings);
        Ok((from, parsed.api, parsed.warnings))
    }

    fn parser(&self, format: Format) -> Result<&Adapter, ConvertError> {
        self.parsers.get(&format).ok_or(ConvertError::UnsupportedFormat {
            format,
            role: "parser",
        })
    }

    fn writer(&self, format: Format) -> Result<&Adapter, ConvertError> {
        self.writers.get(&format).ok_or(ConvertError::UnsupportedFormat {
            format,
            role: "writer",
        })
    }
}

/// Sniff the format of `input`, failing when nothing matches.
pub fn detect_format(input: &[u8]) -> Result<Format, ConvertError> {
    specbridge_formats::detect_format(input).ok_or(ConvertError::FormatDetection)
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        log_adapter_warning!(
            code = %warning.code,
            location = warning.location.as_deref().unwrap_or(""),
            "{}",
            warning.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PING: &str = r#"{"openapi":"3.0.3","info":{"title":"Ping","version":"1"},"paths":{"/ping":{"get":{"responses":{"204":{"description":"pong"}}}}}}"#;

    fn run(
        converter: &Converter,
        input: &str,
        from: Option<Format>,
        to: Format,
        options: &ConvertOptions,
    ) -> (Result<ConvertReport, ConvertError>, Vec<u8>) {
        let mut out = Vec::new();
        let result = converter.convert(
            &Context::new(),
            &mut Cursor::new(input.as_bytes()),
            &mut out,
            from,
            to,
            options,
        );
        (result, out)
    }

    #[test]
    fn converter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Converter>();
    }

    #[test]
    fn empty_registry_rejects_source_before_reading() {
        struct Untouchable;
        impl Read for Untouchable {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("should not be read"))
            }
        }

        let converter = Converter::builder().build();
        let mut out = Vec::new();
        let err = converter
            .convert(
                &Context::new(),
                &mut Untouchable,
                &mut out,
                Some(Format::OpenApi),
                Format::Blueprint,
                &ConvertOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedFormat {
                format: Format::OpenApi,
                role: "parser"
            }
        ));
    }

    #[test]
    fn missing_writer_is_unsupported() {
        let converter = Converter::builder()
            .register_parser(Adapter::for_format(Format::OpenApi))
            .build();
        let (result, out) = run(
            &converter,
            PING,
            None,
            Format::AsyncApi,
            &ConvertOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedFormat {
                role: "writer",
                ..
            })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn detects_and_reports_bytes() {
        let converter = Converter::default();
        let (result, out) = run(
            &converter,
            PING,
            None,
            Format::Blueprint,
            &ConvertOptions::default(),
        );
        let report = result.unwrap();
        assert_eq!(report.from, Format::OpenApi);
        assert_eq!(report.bytes_read, PING.len() as u64);
        assert_eq!(report.bytes_written, out.len() as u64);
        assert!(String::from_utf8(out).unwrap().contains("## /ping [/ping]"));
    }

    #[test]
    fn undetectable_input_fails_detection() {
        let (result, _) = run(
            &Converter::default(),
            "just some words",
            None,
            Format::OpenApi,
            &ConvertOptions::default(),
        );
        assert!(matches!(result, Err(ConvertError::FormatDetection)));
    }

    #[test]
    fn transform_runs_before_write() {
        let converter = Converter::builder()
            .with_builtin_adapters()
            .with_transform(|mut api| {
                api.info.title = "Renamed".to_string();
                api
            })
            .build();
        let (result, out) = run(
            &converter,
            PING,
            Some(Format::OpenApi),
            Format::Blueprint,
            &ConvertOptions::default(),
        );
        result.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\n# Renamed\n"));
    }

    #[test]
    fn validation_fails_closed() {
        let input = PING.replace("/ping", "ping");
        let options = ConvertOptions::new().with_validate(true);
        let (result, out) = run(
            &Converter::default(),
            &input,
            None,
            Format::OpenApi,
            &options,
        );
        match result {
            Err(ConvertError::Validation(results)) => {
                assert!(results.iter().any(|r| r.code == "E5001"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn pooled_buffer_is_returned_after_convert() {
        let converter = Converter::default();
        let (result, _) = run(
            &converter,
            PING,
            None,
            Format::OpenApi,
            &ConvertOptions::default(),
        );
        result.unwrap();
        assert_eq!(converter.buffers.idle(), 1);
    }

    #[test]
    fn validate_reports_without_failing() {
        let input = PING.replace("/ping", "ping");
        let report = Converter::default()
            .validate(&Context::new(), &mut Cursor::new(input.into_bytes()), None)
            .unwrap();
        assert_eq!(report.format, Format::OpenApi);
        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
    }
}
