//! Reader, interpreter and normalizer chained into one call.

use picklejar_foundation::{ParseConfig, Result};
use picklejar_machine::{CancelToken, Vm};
use picklejar_normalize::{NormalizeOptions, NormalizedValue, normalize};
use tracing::debug;

use crate::envelope::Outcome;

/// Interprets and normalizes one stream.
///
/// # Errors
/// Any error raised by the interpreter; normalization itself cannot fail.
pub fn parse_value(bytes: &[u8], config: &ParseConfig, cancel: &CancelToken) -> Result<NormalizedValue> {
    let value = Vm::new(config.clone()).with_cancel_token(cancel.clone()).run(bytes)?;
    Ok(normalize(&value, &NormalizeOptions::from(config)))
}

/// Interprets and normalizes one stream into a transport envelope.
#[must_use]
pub fn parse_bytes(bytes: &[u8], config: &ParseConfig, cancel: &CancelToken) -> Outcome {
    let outcome = Outcome::from(parse_value(bytes, config, cancel));
    if let Some(report) = outcome.error() {
        debug!(kind = report.kind, offset = ?report.offset, detail = %report.detail, "parse rejected");
    }
    outcome
}
