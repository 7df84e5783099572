//! Handling of `<think>…</think>` reasoning blocks in model output.
//!
//! Reasoning models (deepseek-r1, qwen3, …) prefix their answer with a
//! deliberation span. Depending on [`ReasoningMode`] it is either removed or
//! shown to the user as a block quote.

use relay_core::config::ReasoningMode;

pub const OPEN_TAG: &str = "<think>";
pub const CLOSE_TAG: &str = "</think>";
/// Prefix put in front of every surfaced reasoning line.
pub const QUOTE_MARKER: &str = "> ";

/// A slice of model output: plain answer text or the inside of a reasoning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Reasoning(&'a str),
}

/// Split `text` into answer and reasoning pieces.
///
/// Each `<think>` pairs with the next `</think>`. An opener with no closer
/// is left as ordinary text.
fn split_pieces(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(OPEN_TAG) {
        let inner_start = open + OPEN_TAG.len();
        let Some(close) = rest[inner_start..].find(CLOSE_TAG) else {
            break;
        };
        let inner_end = inner_start + close;

        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        pieces.push(Piece::Reasoning(&rest[inner_start..inner_end]));
        rest = &rest[inner_end + CLOSE_TAG.len()..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    pieces
}

/// True when `text` holds at least one complete reasoning block.
pub fn has_reasoning(text: &str) -> bool {
    split_pieces(text)
        .iter()
        .any(|p| matches!(p, Piece::Reasoning(_)))
}

/// Apply the configured reasoning mode. Text without blocks is returned as-is.
pub fn apply(text: &str, mode: ReasoningMode) -> String {
    match mode {
        ReasoningMode::Suppress => suppress(text),
        ReasoningMode::Surface => surface(text),
    }
}

/// Remove every reasoning block (tags included) and trim the remainder.
pub fn suppress(text: &str) -> String {
    let pieces = split_pieces(text);
    if !pieces.iter().any(|p| matches!(p, Piece::Reasoning(_))) {
        return text.to_string();
    }

    let kept: String = pieces
        .iter()
        .filter_map(|p| match p {
            Piece::Text(t) => Some(*t),
            Piece::Reasoning(_) => None,
        })
        .collect();
    kept.trim().to_string()
}

/// Replace every reasoning block with its content quoted line by line.
///
/// Answer text is copied unchanged; a line break is added only where the
/// quote would otherwise run into neighbouring text on the same line.
pub fn surface(text: &str) -> String {
    let pieces = split_pieces(text);
    if !pieces.iter().any(|p| matches!(p, Piece::Reasoning(_))) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut after_quote = false;

    for piece in pieces {
        match piece {
            Piece::Text(t) => {
                if after_quote && !t.starts_with('\n') {
                    out.push('\n');
                }
                out.push_str(t);
                after_quote = false;
            }
            Piece::Reasoning(inner) => {
                let inner = inner.trim();
                if inner.is_empty() {
                    continue;
                }
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&quote(inner));
                after_quote = true;
            }
        }
    }
    out
}

fn quote(inner: &str) -> String {
    inner
        .lines()
        .map(|line| format!("{QUOTE_MARKER}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
