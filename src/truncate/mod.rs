//! Prompt truncation to a token budget.
//!
//! The truncator never tokenizes. It receives byte spans from a tokenizer and
//! picks which substring of the prompt to keep.

pub mod error;


pub use error::TruncateError;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Byte range `[start, stop)` of one token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub stop: usize,
}

impl TokenSpan {
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }
}

/// Which part of an over-long prompt to keep.
///
/// Accepted on the wire by name (case-insensitive) or by numeric code:
/// `1` head, `2` tail, `3` middle, `4` ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateStrategy {
    /// Drop leading tokens, keep the last `M`.
    Head,
    /// Drop trailing tokens, keep the first `M`.
    Tail,
    /// Drop tokens from the middle, keep both ends.
    #[default]
    Middle,
    /// Drop tokens from both ends, keep a centered window.
    Ends,
}

impl TruncateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Middle => "middle",
            Self::Ends => "ends",
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Head => 1,
            Self::Tail => 2,
            Self::Middle => 3,
            Self::Ends => 4,
        }
    }
}

impl fmt::Display for TruncateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TruncateStrategy {
    type Err = TruncateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<i64>() {
            return Self::try_from(code);
        }

        match s.trim().to_ascii_lowercase().as_str() {
            "head" => Ok(Self::Head),
            "tail" => Ok(Self::Tail),
            "middle" => Ok(Self::Middle),
            "ends" => Ok(Self::Ends),
            _ => Err(TruncateError::UnsupportedStrategy {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<i64> for TruncateStrategy {
    type Error = TruncateError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Head),
            2 => Ok(Self::Tail),
            3 => Ok(Self::Middle),
            4 => Ok(Self::Ends),
            _ => Err(TruncateError::UnsupportedStrategy {
                value: code.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for TruncateStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Self::try_from(code),
            Repr::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Cuts `text` down to at most `max_tokens` of the given `tokens`.
///
/// Returns `text` unchanged (borrowed) when it already fits. Spans must be in
/// order, within `text`, and land on character boundaries where they are used
/// to slice; anything else is [`TruncateError::InvalidTokenOffsets`].
pub fn truncate<'a>(
    text: &'a str,
    tokens: &[TokenSpan],
    max_tokens: usize,
    strategy: TruncateStrategy,
) -> Result<Cow<'a, str>, TruncateError> {
    if max_tokens == 0 {
        return Err(TruncateError::InvalidBudget);
    }

    let n = tokens.len();
    if n <= max_tokens {
        return Ok(Cow::Borrowed(text));
    }

    check_spans(text, tokens)?;
    let m = max_tokens;

    let kept = match strategy {
        TruncateStrategy::Head => Cow::Borrowed(slice_from(text, tokens, n - m, Edge::Start)?),
        TruncateStrategy::Tail => Cow::Borrowed(slice_to(text, tokens, m - 1, Edge::Stop)?),
        TruncateStrategy::Middle => {
            let offset = m / 2;
            let front = slice_to(text, tokens, offset, Edge::Start)?;
            let back = slice_from(text, tokens, n + offset - m - 1, Edge::Stop)?;

            let mut joined = String::with_capacity(front.len() + back.len());
            joined.push_str(front);
            joined.push_str(back);
            Cow::Owned(joined)
        }
        TruncateStrategy::Ends => {
            let offset = (n - m) / 2;
            let start = boundary(text, tokens, offset, Edge::Start)?;
            let stop = boundary(text, tokens, offset + m - 1, Edge::Stop)?;
            Cow::Borrowed(&text[start..stop])
        }
    };

    Ok(kept)
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    Stop,
}

fn check_spans(text: &str, tokens: &[TokenSpan]) -> Result<(), TruncateError> {
    let invalid = |index: usize, reason: String| TruncateError::InvalidTokenOffsets { index, reason };
    let mut prev: Option<&TokenSpan> = None;

    for (index, span) in tokens.iter().enumerate() {
        if span.start > span.stop {
            return Err(invalid(
                index,
                format!("start {} is after stop {}", span.start, span.stop),
            ));
        }

        if span.stop > text.len() {
            return Err(invalid(
                index,
                format!("stop {} is past text length {}", span.stop, text.len()),
            ));
        }

        if let Some(prev) = prev
            && (span.start < prev.start || span.stop < prev.stop)
        {
            return Err(invalid(
                index,
                format!(
                    "span {}..{} goes backwards from {}..{}",
                    span.start, span.stop, prev.start, prev.stop
                ),
            ));
        }

        // A span may repeat when one character is split into several tokens.
        if let Some(prev) = prev
            && span != prev
            && span.start < prev.stop
        {
            return Err(invalid(
                index,
                format!(
                    "span {}..{} overlaps {}..{}",
                    span.start, span.stop, prev.start, prev.stop
                ),
            ));
        }

        prev = Some(span);
    }

    Ok(())
}

fn boundary(
    text: &str,
    tokens: &[TokenSpan],
    index: usize,
    edge: Edge,
) -> Result<usize, TruncateError> {
    let span = tokens[index];
    let offset = match edge {
        Edge::Start => span.start,
        Edge::Stop => span.stop,
    };

    if !text.is_char_boundary(offset) {
        return Err(TruncateError::InvalidTokenOffsets {
            index,
            reason: format!("offset {} is not on a character boundary", offset),
        });
    }

    Ok(offset)
}

fn slice_from<'a>(
    text: &'a str,
    tokens: &[TokenSpan],
    index: usize,
    edge: Edge,
) -> Result<&'a str, TruncateError> {
    Ok(&text[boundary(text, tokens, index, edge)?..])
}

fn slice_to<'a>(
    text: &'a str,
    tokens: &[TokenSpan],
    index: usize,
    edge: Edge,
) -> Result<&'a str, TruncateError> {
    Ok(&text[..boundary(text, tokens, index, edge)?])
}
