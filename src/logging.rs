//! Tracing subscriber setup.
//!
//! Everything written to stderr passes through [`RedactingWriter`] so a bot
//! token that ends up in an error message (teloxide includes request URLs)
//! never reaches the logs.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    url_token: Regex,
    bare_token: Regex,
    prefixed_token: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            url_token: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            prefixed_token: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    /// Mask every Telegram token found in `input`.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let output = self
            .url_token
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        let output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        self.prefixed_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string()
    }
}

/// Writer that redacts secrets before forwarding to `inner`.
pub struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    /// Wrap `inner` with the given patterns.
    pub const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hands `tracing-subscriber` a fresh [`RedactingWriter`] per event.
struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Default filter when `RUST_LOG` is not set.
///
/// `DEBUG_MODE=true` (or `1`) switches everything to debug.
#[must_use]
pub fn default_filter(debug_mode: bool) -> &'static str {
    if debug_mode {
        "debug"
    } else {
        "insurance_miniapp_bot=info,teloxide=info,hyper=warn,reqwest=warn,tokio=warn"
    }
}

/// Install the global tracing subscriber writing redacted output to stderr.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug_mode)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "1234567890:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw1";

    #[test]
    fn test_redacts_token_in_url() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let line = format!("error sending request for url (https://api.telegram.org/bot{TOKEN}/SendMessage)");
        let redacted = patterns.redact(&line);

        assert!(!redacted.contains(TOKEN));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
        Ok(())
    }

    #[test]
    fn test_redacts_bare_token() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let redacted = patterns.redact(&format!("token={TOKEN}"));
        assert_eq!(redacted, "token=[TELEGRAM_TOKEN]");
        Ok(())
    }

    #[test]
    fn test_plain_text_untouched() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let line = "Submission from user 42 delivered to admin";
        assert_eq!(patterns.redact(line), line);
        Ok(())
    }

    #[test]
    fn test_writer_redacts_and_reports_full_length() -> Result<(), Box<dyn std::error::Error>> {
        let patterns = Arc::new(RedactionPatterns::new()?);
        let mut writer = RedactingWriter::new(Vec::new(), patterns);

        let input = format!("bot{TOKEN}");
        let written = writer.write(input.as_bytes())?;

        assert_eq!(written, input.len());
        let output = String::from_utf8(writer.inner)?;
        assert!(!output.contains("AAHdq"));
        Ok(())
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "debug");
        assert!(default_filter(false).starts_with("insurance_miniapp_bot=info"));
    }
}
