//! Log sanitization utilities for PII filtering.
//!
//! String-based redaction applied to formatted log output before it reaches
//! a sink, covering the identifiers this system handles:
//! - Record and transaction UUIDs
//! - National identity numbers (Aadhaar-style 12 digit groups)
//! - Phone numbers and email addresses
//! - Long hex digests (patient keys, content refs, fingerprint digests)
//!
//! # Important: prefer structured logging + redaction-by-type
//!
//! Sanitizing strings is a defense-in-depth fallback. The primary protection
//! is that sensitive types (`FingerprintTemplate`, `PatientKey`) already
//! redact or restrict their `Debug` output; this writer catches what slips
//! into formatted messages anyway.
//!
//! # Performance / DoS
//!
//! `sanitize()` enforces a maximum input size (see
//! `HEALTHCHAIN_SANITIZE_MAX_BYTES`) so maliciously large log lines cannot
//! turn redaction into a CPU sink.

use regex::Regex;
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

/// Compiled patterns for PII detection and sanitization.
static PII_PATTERNS: OnceLock<Vec<PiiPattern>> = OnceLock::new();

/// Maximum number of bytes to sanitize per call.
///
/// Defaults to 16 KiB; can be overridden via `HEALTHCHAIN_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    // Ensure we don't panic on UTF-8 boundaries.
    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEALTHCHAIN_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Initialize PII patterns (called once at startup).
fn get_patterns() -> &'static Vec<PiiPattern> {
    PII_PATTERNS.get_or_init(|| {
        // NOTE: Rust's `regex` crate is linear-time (no catastrophic
        // backtracking); patterns stay simple and input size is capped.
        let rules: Vec<(&'static str, &'static str)> = vec![
            // UUIDs (record ids, tx ids)
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            // Aadhaar-style national id: 12 digits in groups of 4
            (r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}\b", "[REDACTED-NATIONAL-ID]"),
            // Email addresses (bounded labels; case-insensitive)
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            // Phone numbers
            (
                r"\b(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
                "[REDACTED-PHONE]",
            ),
            // Long hex strings: patient keys, content refs, digests
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-DIGEST]"),
        ];

        rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect()
    })
}

/// Sanitize a string by replacing PII patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for pattern in get_patterns() {
        if pattern.regex.is_match(&result) {
            result = pattern
                .regex
                .replace_all(&result, pattern.replacement)
                .to_string();
        }
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains potential PII.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().iter().any(|p| p.regex.is_match(prefix))
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log output
/// before it is written to the underlying sink.
///
/// Keeps sanitization centralized (no need to call `sanitize()` at every
/// callsite); still defense-in-depth next to redaction-by-type.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line_str = String::from_utf8_lossy(&line);
            let sanitized = sanitize(&line_str);
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // Prevent unbounded buffering if the formatter writes a huge line
        // with no newlines; `sanitize()` also caps the output.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let s = String::from_utf8_lossy(&self.buffer).to_string();
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let s = String::from_utf8_lossy(&self.buffer);
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_uuid() {
        let input = "record_id: 550e8400-e29b-41d4-a716-446655440000 stored";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_national_id() {
        let input = "aadhar: 1234-5678-9012";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-NATIONAL-ID]"));
        assert!(!sanitized.contains("1234-5678-9012"));
    }

    #[test]
    fn test_sanitize_email() {
        let input = "Contact: patient@hospital.com";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_sanitize_patient_key() {
        let key_hex = "a".repeat(64);
        let sanitized = sanitize(&format!("key={key_hex}"));
        assert!(sanitized.contains("[REDACTED-DIGEST]"));
        assert!(!sanitized.contains(&key_hex));
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("ID: 550e8400-e29b-41d4-a716-446655440000"));
        assert!(contains_pii("aadhar 1234 5678 9012"));
        assert!(!contains_pii("Just normal log text"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix 0123456789abcdef0123456789abcdef suffix";
        let sanitized = sanitize_with_limit(input, 16);
        assert!(sanitized.contains("[TRUNCATED]"));
    }
}
