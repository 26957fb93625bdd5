use serde::{ Serialize, Deserialize };
use std::ops::Range;

/// The five syntactic forms a reply string can contain, in precedence
/// order: a span claimed by an earlier form is never reconsidered by a
/// later one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentKind {
    BlockMath,
    CodeBlock,
    InlineCode,
    InlineMath,
    Text,
}

/// One typed, positionally-bounded unit of parsed output. `value` holds
/// the content with delimiters stripped; `span` is the byte range of the
/// whole segment (delimiters included) in the source string. Spans of
/// consecutive segments partition `[0, source.len())`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: String,
    pub language: Option<String>,
    pub span: Range<usize>,
}

impl Segment {
    fn text(source: &str, span: Range<usize>) -> Self {
        Self {
            kind: SegmentKind::Text,
            value: source[span.clone()].to_string(),
            language: None,
            span,
        }
    }
}

/// Outcome of matching one delimited form at a fixed position: extracted
/// value, optional language tag, and the number of source bytes consumed
/// including delimiters.
struct DelimitedMatch {
    value: String,
    language: Option<String>,
    consumed: usize,
}

/// Partitions a reply string into an ordered sequence of segments.
///
/// Single left-to-right scan: at each position the delimited forms are
/// tried in precedence order (block math, fenced code, inline code, inline
/// math) and the first match is consumed whole; stretches claimed by no
/// form become plain-text segments. Unterminated delimiters fall through
/// to literal text. Pure function of its input.
pub fn parse_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let bytes = input.as_bytes();
    let mut text_start = 0;
    let mut i = 0;

    while i < input.len() {
        let line_initial = i == 0 || bytes[i - 1] == b'\n';
        match match_delimited(&input[i..], line_initial) {
            Some((kind, m)) => {
                if text_start < i {
                    segments.push(Segment::text(input, text_start..i));
                }
                let end = i + m.consumed;
                segments.push(Segment {
                    kind,
                    value: m.value,
                    language: m.language,
                    span: i..end,
                });
                i = end;
                text_start = i;
            }
            None => {
                // All delimiters are ASCII, so stepping by whole chars
                // keeps every candidate position on a boundary.
                i += input[i..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if text_start < input.len() {
        segments.push(Segment::text(input, text_start..input.len()));
    }

    segments
}

fn match_delimited(rest: &str, line_initial: bool) -> Option<(SegmentKind, DelimitedMatch)> {
    if let Some(m) = match_block_math(rest) {
        return Some((SegmentKind::BlockMath, m));
    }
    if line_initial {
        if let Some(m) = match_code_block(rest) {
            return Some((SegmentKind::CodeBlock, m));
        }
    }
    if let Some(m) = match_inline_code(rest) {
        return Some((SegmentKind::InlineCode, m));
    }
    if let Some(m) = match_inline_math(rest) {
        return Some((SegmentKind::InlineMath, m));
    }
    None
}

/// `$$ … $$` (content may be empty and span lines) or `\[ … \]`. Content
/// passes through verbatim.
fn match_block_math(rest: &str) -> Option<DelimitedMatch> {
    for (open, close) in [("$$", "$$"), ("\\[", "\\]")] {
        if let Some(after) = rest.strip_prefix(open) {
            if let Some(end) = after.find(close) {
                return Some(DelimitedMatch {
                    value: after[..end].to_string(),
                    language: None,
                    consumed: open.len() + end + close.len(),
                });
            }
        }
    }
    None
}

/// Line-initial ``` with an optional language tag, a required newline,
/// then verbatim content up to the next ```. The closing fence need not be
/// line-initial.
fn match_code_block(rest: &str) -> Option<DelimitedMatch> {
    let after = rest.strip_prefix("```")?;
    let lang_len = after
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if after.as_bytes().get(lang_len) != Some(&b'\n') {
        return None;
    }

    let body = &after[lang_len + 1..];
    let end = body.find("```")?;
    let language = if lang_len > 0 {
        Some(after[..lang_len].to_string())
    } else {
        None
    };

    Some(DelimitedMatch {
        value: body[..end].to_string(),
        language,
        consumed: 3 + lang_len + 1 + end + 3,
    })
}

/// `` ` … ` `` with non-empty content containing no backtick.
fn match_inline_code(rest: &str) -> Option<DelimitedMatch> {
    let after = rest.strip_prefix('`')?;
    let end = after.find('`')?;
    if end == 0 {
        return None;
    }
    Some(DelimitedMatch {
        value: after[..end].to_string(),
        language: None,
        consumed: end + 2,
    })
}

/// `$ … $` with non-empty content containing neither `$` nor a newline,
/// or `\( … \)` with non-empty content containing no `)`.
fn match_inline_math(rest: &str) -> Option<DelimitedMatch> {
    if let Some(after) = rest.strip_prefix('$') {
        for (offset, b) in after.bytes().enumerate() {
            match b {
                b'$' if offset > 0 => {
                    return Some(DelimitedMatch {
                        value: after[..offset].to_string(),
                        language: None,
                        consumed: offset + 2,
                    });
                }
                b'$' | b'\n' => return None,
                _ => {}
            }
        }
        return None;
    }

    if let Some(after) = rest.strip_prefix("\\(") {
        let end = after.find(')')?;
        if end < 2 || after.as_bytes()[end - 1] != b'\\' {
            return None;
        }
        return Some(DelimitedMatch {
            value: after[..end - 1].to_string(),
            language: None,
            consumed: 2 + end + 1,
        });
    }

    None
}
