//! Streaming batch processor.
//!
//! Drives one run: detect the format from a short peek, then read bounded
//! batches of lines, redact each line, and write it out immediately. Memory
//! use is bounded by the batch size, never by the input size.
//!
//! Line terminators are carried through untouched. A `\r\n` line is written
//! back with `\r\n`, and a final line without a newline stays without one.

use crate::format::FormatDetector;
use crate::{LogFormat, RedactionEngine, RedactionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on lines held while peeking for detection.
const MAX_PEEK_LINES: usize = 1_000;

/// Cap on the batch buffer's up-front allocation.
const INITIAL_BATCH_CAPACITY: usize = 16_384;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Detecting,
    Streaming,
    Flushing,
    Done,
    /// An I/O error stopped the run; output written so far stays on disk.
    Aborted,
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Lines per batch.
    pub batch_size: usize,
    /// Flush output every this many batches.
    pub flush_every_batches: usize,
    /// Skip detection and use this format.
    pub format: Option<LogFormat>,
    /// Non-empty lines sampled for detection.
    pub detect_sample_lines: usize,
    /// Input name reported in the summary.
    pub input_label: String,
    /// Output name reported in the summary.
    pub output_label: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::policy::DEFAULT_BATCH_SIZE,
            flush_every_batches: crate::policy::DEFAULT_FLUSH_EVERY_BATCHES,
            format: None,
            detect_sample_lines: crate::DEFAULT_SAMPLE_LINES,
            input_label: "-".to_string(),
            output_label: "-".to_string(),
        }
    }
}

impl StreamOptions {
    /// Options derived from a config.
    pub fn from_config(config: &crate::RedactorConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            flush_every_batches: config.flush_every_batches,
            detect_sample_lines: config.detect_sample_lines,
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_label = input.into();
        self.output_label = output.into();
        self
    }

    pub fn with_format(mut self, format: Option<LogFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RedactionError::invalid("batch_size", "must be at least 1"));
        }
        if self.flush_every_batches == 0 {
            return Err(RedactionError::invalid(
                "flush_every_batches",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Counters reported after each batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    /// 1-based batch number.
    pub batch_index: u64,
    /// Lines in this batch.
    pub batch_lines: usize,
    /// Lines processed so far.
    pub lines_processed: u64,
    /// Input bytes consumed so far.
    pub bytes_processed: u64,
    /// Seconds since streaming began.
    pub elapsed_seconds: f64,
    /// Throughput so far.
    pub lines_per_second: f64,
}

/// Receives progress callbacks during a run.
pub trait ProgressObserver {
    /// Called once, after the format is known.
    fn on_format_detected(&mut self, _format: LogFormat, _forced: bool) {}

    /// Called after each batch has been written.
    fn on_batch(&mut self, _progress: &BatchProgress) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Count and description for one pattern in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTally {
    pub count: u64,
    pub description: String,
}

/// Snapshot produced once at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input: String,
    pub output: String,
    pub format: LogFormat,
    /// Format was given rather than detected.
    pub format_forced: bool,
    pub lines_processed: u64,
    pub bytes_processed: u64,
    pub bytes_written: u64,
    pub batches: u64,
    pub elapsed_seconds: f64,
    /// Stopped early on a cancellation request.
    pub interrupted: bool,
    /// Lines that were not valid UTF-8 and were decoded lossily.
    pub lossy_lines: u64,
    pub phone_validator: String,
    pub phone_cache_hits: u64,
    pub phone_cache_misses: u64,
    /// Non-zero per-pattern counts.
    pub redactions: BTreeMap<String, PatternTally>,
}

impl RunSummary {
    /// Total redactions across all patterns.
    pub fn total_redactions(&self) -> u64 {
        self.redactions.values().map(|t| t.count).sum()
    }

    /// Lines per second over the whole run.
    pub fn lines_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.lines_processed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Line terminator as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    None,
    Lf,
    CrLf,
}

impl Terminator {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::None => b"",
            Terminator::Lf => b"\n",
            Terminator::CrLf => b"\r\n",
        }
    }
}

/// One input line with its terminator split off.
#[derive(Debug)]
struct Line {
    text: String,
    terminator: Terminator,
    raw_len: usize,
    lossy: bool,
}

/// Line reader with a pushback buffer for the detection peek.
struct LineReader<R> {
    inner: R,
    peeked: VecDeque<Line>,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: VecDeque::new(),
            buf: Vec::new(),
        }
    }

    fn read_raw(&mut self) -> Result<Option<Line>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(RedactionError::ReadFailure)?;
        if n == 0 {
            return Ok(None);
        }

        let mut terminator = Terminator::None;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            terminator = Terminator::Lf;
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
                terminator = Terminator::CrLf;
            }
        }

        let bytes = std::mem::take(&mut self.buf);
        let (text, lossy) = match String::from_utf8(bytes) {
            Ok(text) => (text, false),
            Err(err) => (String::from_utf8_lossy(err.as_bytes()).into_owned(), true),
        };
        Ok(Some(Line {
            text,
            terminator,
            raw_len: n,
            lossy,
        }))
    }

    /// Buffer lines until `wanted` non-blank ones are held or input ends.
    fn peek_non_blank(&mut self, wanted: usize) -> Result<()> {
        let mut non_blank = 0;
        while non_blank < wanted && self.peeked.len() < MAX_PEEK_LINES {
            match self.read_raw()? {
                Some(line) => {
                    if !line.text.trim().is_empty() {
                        non_blank += 1;
                    }
                    self.peeked.push_back(line);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn peeked(&self) -> impl Iterator<Item = &str> {
        self.peeked.iter().map(|l| l.text.as_str())
    }

    fn next_line(&mut self) -> Result<Option<Line>> {
        match self.peeked.pop_front() {
            Some(line) => Ok(Some(line)),
            None => self.read_raw(),
        }
    }
}

/// Classify a stream from its leading lines without redacting it.
///
/// Reads at most `sample_lines` non-blank lines (and never more than the
/// processor's peek limit), the same window [`StreamProcessor::process`]
/// inspects.
pub fn detect_stream<R: BufRead>(input: R, sample_lines: usize) -> Result<LogFormat> {
    let detector = FormatDetector::new(sample_lines);
    let mut reader = LineReader::new(input);
    reader.peek_non_blank(detector.sample_lines())?;
    Ok(detector.detect(reader.peeked()))
}

/// Runs one input stream through a [`RedactionEngine`].
pub struct StreamProcessor {
    engine: RedactionEngine,
    options: StreamOptions,
    state: RunState,
    cancel: Option<Arc<AtomicBool>>,
}

impl StreamProcessor {
    pub fn new(engine: RedactionEngine, options: StreamOptions) -> Self {
        Self {
            engine,
            options,
            state: RunState::Idle,
            cancel: None,
        }
    }

    /// Stop after the current batch once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn engine(&self) -> &RedactionEngine {
        &self.engine
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Process the whole input, writing redacted lines to `output`.
    ///
    /// Options are checked before anything is read. On a read or write
    /// failure the processor moves to [`RunState::Aborted`] and no summary
    /// is produced.
    pub fn process<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: W,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary> {
        self.options.validate()?;
        let result = self.run(input, output, observer);
        if result.is_err() {
            self.state = RunState::Aborted;
        }
        result
    }

    fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let mut reader = LineReader::new(input);

        self.state = RunState::Detecting;
        let (format, forced) = match self.options.format {
            Some(format) => (format, true),
            None => {
                reader.peek_non_blank(self.options.detect_sample_lines)?;
                let detector = FormatDetector::new(self.options.detect_sample_lines);
                (detector.detect(reader.peeked()), false)
            }
        };
        tracing::info!(
            target: "format.detected",
            format = %format,
            forced,
            input = %self.options.input_label,
            "log format selected"
        );
        observer.on_format_detected(format, forced);

        self.state = RunState::Streaming;
        let batch_size = self.options.batch_size;
        let mut batch: Vec<Line> = Vec::with_capacity(batch_size.min(INITIAL_BATCH_CAPACITY));
        let mut lines_processed = 0u64;
        let mut bytes_processed = 0u64;
        let mut bytes_written = 0u64;
        let mut lossy_lines = 0u64;
        let mut batches = 0u64;
        let mut interrupted = false;

        loop {
            batch.clear();
            while batch.len() < batch_size {
                match reader.next_line()? {
                    Some(line) => batch.push(line),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            let exhausted = batch.len() < batch_size;

            for line in &batch {
                let redacted = self.engine.redact_unit(&line.text, format);
                output
                    .write_all(redacted.as_bytes())
                    .and_then(|_| output.write_all(line.terminator.as_bytes()))
                    .map_err(RedactionError::WriteFailure)?;
                bytes_written += (redacted.len() + line.terminator.as_bytes().len()) as u64;
                bytes_processed += line.raw_len as u64;
                if line.lossy {
                    lossy_lines += 1;
                }
            }

            batches += 1;
            lines_processed += batch.len() as u64;

            if batches % self.options.flush_every_batches as u64 == 0 {
                output.flush().map_err(RedactionError::WriteFailure)?;
            }

            let elapsed = started.elapsed().as_secs_f64();
            let progress = BatchProgress {
                batch_index: batches,
                batch_lines: batch.len(),
                lines_processed,
                bytes_processed,
                elapsed_seconds: elapsed,
                lines_per_second: if elapsed > 0.0 {
                    lines_processed as f64 / elapsed
                } else {
                    0.0
                },
            };
            tracing::debug!(
                target: "batch.processed",
                batch = progress.batch_index,
                lines = progress.batch_lines,
                lines_processed = progress.lines_processed,
                "batch written"
            );
            observer.on_batch(&progress);

            if self.cancelled() {
                interrupted = true;
                tracing::warn!(
                    target: "run.interrupted",
                    lines_processed,
                    "stopping after current batch"
                );
                break;
            }
            if exhausted {
                break;
            }
        }

        self.state = RunState::Flushing;
        output.flush().map_err(RedactionError::WriteFailure)?;

        let summary = self.summarize(SummaryCounts {
            format,
            forced,
            lines_processed,
            bytes_processed,
            bytes_written,
            batches,
            lossy_lines,
            interrupted,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        });
        self.state = RunState::Done;
        tracing::info!(
            target: "run.finished",
            lines = summary.lines_processed,
            redactions = summary.total_redactions(),
            interrupted = summary.interrupted,
            "redaction run finished"
        );
        Ok(summary)
    }

    fn summarize(&self, counts: SummaryCounts) -> RunSummary {
        let registry = self.engine.registry();
        let redactions = self
            .engine
            .stats()
            .iter()
            .map(|(name, count)| {
                let description = registry
                    .get(name)
                    .map(|p| p.description().to_string())
                    .unwrap_or_default();
                (name.to_string(), PatternTally { count, description })
            })
            .collect();
        let phone = self.engine.phone();

        RunSummary {
            input: self.options.input_label.clone(),
            output: self.options.output_label.clone(),
            format: counts.format,
            format_forced: counts.forced,
            lines_processed: counts.lines_processed,
            bytes_processed: counts.bytes_processed,
            bytes_written: counts.bytes_written,
            batches: counts.batches,
            elapsed_seconds: counts.elapsed_seconds,
            interrupted: counts.interrupted,
            lossy_lines: counts.lossy_lines,
            phone_validator: phone.validator_name().to_string(),
            phone_cache_hits: phone.cache().hits(),
            phone_cache_misses: phone.cache().misses(),
            redactions,
        }
    }
}

struct SummaryCounts {
    format: LogFormat,
    forced: bool,
    lines_processed: u64,
    bytes_processed: u64,
    bytes_written: u64,
    batches: u64,
    lossy_lines: u64,
    interrupted: bool,
    elapsed_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phone::ValidatorKind;
    use crate::RedactorConfig;
    use std::io::Cursor;

    fn processor(batch_size: usize) -> StreamProcessor {
        let config = RedactorConfig::default().with_phone_validator(ValidatorKind::Heuristic);
        let engine = RedactionEngine::from_config(&config).unwrap();
        StreamProcessor::new(
            engine,
            StreamOptions::from_config(&config).with_batch_size(batch_size),
        )
    }

    #[test]
    fn test_detect_stream_skips_blank_lines() {
        let input = b"\n\n{\"t\":{\"$date\":\"2025-07-16T05:18:53.846+00:00\"},\"msg\":\"x\"}\n";
        assert_eq!(
            detect_stream(Cursor::new(&input[..]), 5).unwrap(),
            LogFormat::Structured
        );
        assert_eq!(
            detect_stream(Cursor::new(&b"[conn1] hello\n"[..]), 5).unwrap(),
            LogFormat::Freeform
        );
        assert_eq!(
            detect_stream(Cursor::new(&b""[..]), 5).unwrap(),
            LogFormat::Freeform
        );
    }

    fn run(batch_size: usize, input: &[u8]) -> (Vec<u8>, RunSummary) {
        let mut p = processor(batch_size);
        let mut out = Vec::new();
        let summary = p
            .process(Cursor::new(input), &mut out, &mut NoopObserver)
            .unwrap();
        assert_eq!(p.state(), RunState::Done);
        (out, summary)
    }

    struct Recorder {
        formats: Vec<(LogFormat, bool)>,
        batches: Vec<usize>,
    }

    impl ProgressObserver for Recorder {
        fn on_format_detected(&mut self, format: LogFormat, forced: bool) {
            self.formats.push((format, forced));
        }

        fn on_batch(&mut self, progress: &BatchProgress) {
            self.batches.push(progress.batch_lines);
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_empty_input() {
        let (out, summary) = run(10, b"");
        assert!(out.is_empty());
        assert_eq!(summary.lines_processed, 0);
        assert_eq!(summary.batches, 0);
        assert_eq!(summary.format, LogFormat::Freeform);
        assert!(summary.redactions.is_empty());
    }

    #[test]
    fn test_terminators_preserved() {
        let input = b"conn1 a\r\nconn2 b\n\nconn3 c";
        let (out, summary) = run(2, input);
        assert_eq!(out, b"connX a\r\nconnX b\n\nconnX c".to_vec());
        assert_eq!(summary.lines_processed, 4);
        assert_eq!(summary.bytes_processed, input.len() as u64);
        assert_eq!(summary.bytes_written, out.len() as u64);
        assert_eq!(summary.batches, 2);
    }

    #[test]
    fn test_detects_structured_after_peek_without_losing_lines() {
        let input = b"\n\n{\"attr\":{\"connectionId\":15191}}\n{\"opId\":77}\n";
        let (out, summary) = run(1, input);
        assert_eq!(summary.format, LogFormat::Structured);
        assert!(!summary.format_forced);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\n\n{\"attr\":{\"connectionId\":XXXXX}}\n{\"opId\":XX}\n"
        );
        assert_eq!(summary.redactions["connection_ids"].count, 1);
        assert_eq!(summary.redactions["operation_ids"].count, 1);
        assert_eq!(
            summary.redactions["operation_ids"].description,
            "Atlas operation IDs"
        );
    }

    #[test]
    fn test_forced_format() {
        let config = RedactorConfig::default().with_phone_validator(ValidatorKind::Heuristic);
        let engine = RedactionEngine::from_config(&config).unwrap();
        let options = StreamOptions::from_config(&config).with_format(Some(LogFormat::Structured));
        let mut p = StreamProcessor::new(engine, options);
        let mut recorder = Recorder {
            formats: Vec::new(),
            batches: Vec::new(),
        };
        let mut out = Vec::new();
        let summary = p
            .process(Cursor::new(&b"conn12 x\n"[..]), &mut out, &mut recorder)
            .unwrap();
        assert_eq!(recorder.formats, vec![(LogFormat::Structured, true)]);
        assert_eq!(out, b"conn12 x\n".to_vec());
        assert!(summary.format_forced);
    }

    #[test]
    fn test_observer_sees_each_batch() {
        let input = "conn1\n".repeat(7);
        let mut p = processor(3);
        let mut recorder = Recorder {
            formats: Vec::new(),
            batches: Vec::new(),
        };
        let mut out = Vec::new();
        p.process(Cursor::new(input.as_bytes()), &mut out, &mut recorder)
            .unwrap();
        assert_eq!(recorder.batches, vec![3, 3, 1]);
        assert_eq!(recorder.formats, vec![(LogFormat::Freeform, false)]);
    }

    #[test]
    fn test_cancel_stops_after_current_batch() {
        let input = "conn1\n".repeat(10);
        let flag = Arc::new(AtomicBool::new(true));
        let mut p = processor(4).with_cancel_flag(flag);
        let mut out = Vec::new();
        let summary = p
            .process(Cursor::new(input.as_bytes()), &mut out, &mut NoopObserver)
            .unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.lines_processed, 4);
        assert_eq!(out, "connX\n".repeat(4).into_bytes());
    }

    #[test]
    fn test_write_failure_aborts() {
        let mut p = processor(10);
        let err = p
            .process(Cursor::new(&b"hello\n"[..]), FailingWriter, &mut NoopObserver)
            .unwrap_err();
        assert!(matches!(err, RedactionError::WriteFailure(_)));
        assert_eq!(p.state(), RunState::Aborted);
    }

    #[test]
    fn test_zero_batch_size_rejected_before_io() {
        let mut p = processor(0);
        let mut out = Vec::new();
        let err = p
            .process(Cursor::new(&b"conn1\n"[..]), &mut out, &mut NoopObserver)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_configuration");
        assert!(out.is_empty());
        assert_eq!(p.state(), RunState::Idle);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let input = b"conn7 \xff\xfe tail\nok\n";
        let (out, summary) = run(10, input);
        assert_eq!(summary.lossy_lines, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("connX "));
        assert!(text.ends_with(" tail\nok\n"));
    }

    #[test]
    fn test_summary_helpers() {
        let (_, summary) = run(10, b"conn1 conn22 10.0.0.1\n");
        assert_eq!(summary.total_redactions(), 3);
        assert_eq!(summary.phone_validator, "heuristic");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["format"], "freeform");
        assert_eq!(json["redactions"]["legacy_conn_ids"]["count"], 2);
    }
}
