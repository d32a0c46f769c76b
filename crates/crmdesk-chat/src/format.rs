// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ChartSpec;

const CHART_FENCE_OPEN: &str = "```chart";
const FENCE: &str = "```";
pub const CHART_ERROR_TEXT: &str = "Failed to render chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub style: SpanStyle,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Plain,
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichLine {
    pub kind: LineKind,
    pub spans: Vec<Span>,
}

impl RichLine {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub lines: Vec<RichLine>,
}

impl RichText {
    /// Text shown verbatim, one line per input line.
    pub fn literal(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(|line| RichLine {
                    kind: LineKind::Plain,
                    spans: vec![Span {
                        style: SpanStyle::Plain,
                        text: line.to_owned(),
                    }],
                })
                .collect(),
        }
    }

    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(RichLine::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(RichText),
    Chart(ChartSpec),
    ChartError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawSegment<'a> {
    Text(&'a str),
    Chart(&'a str),
}

/// Splits on ```` ```chart ```` fences. The opening marker may be followed
/// by whitespace; the body runs to the next ```` ``` ````. An unterminated
/// fence stays plain text.
fn split_chart_blocks(raw: &str) -> Vec<RawSegment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = raw[cursor..].find(CHART_FENCE_OPEN) {
        let open = cursor + offset;
        let after_marker = open + CHART_FENCE_OPEN.len();
        let body_start = after_marker
            + raw[after_marker..]
                .find(|ch: char| !ch.is_whitespace())
                .unwrap_or(raw.len() - after_marker);
        let Some(close_offset) = raw[body_start..].find(FENCE) else {
            break;
        };
        let close = body_start + close_offset;

        if open > cursor {
            segments.push(RawSegment::Text(&raw[cursor..open]));
        }
        segments.push(RawSegment::Chart(&raw[body_start..close]));
        cursor = close + FENCE.len();
    }
    if cursor < raw.len() {
        segments.push(RawSegment::Text(&raw[cursor..]));
    }
    segments
}

/// Formats an assistant reply into ordered text and chart segments. A chart
/// body that fails to parse becomes a [`Segment::ChartError`] in place.
pub fn format_response(raw: &str) -> Vec<Segment> {
    split_chart_blocks(raw)
        .into_iter()
        .filter_map(|segment| match segment {
            RawSegment::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Segment::Text(render_markdown(trimmed)))
                }
            }
            RawSegment::Chart(body) => match serde_json::from_str::<ChartSpec>(body) {
                Ok(spec) => Some(Segment::Chart(spec)),
                Err(error) => {
                    tracing::debug!(%error, "chart block did not parse");
                    Some(Segment::ChartError(CHART_ERROR_TEXT.to_owned()))
                }
            },
        })
        .collect()
}

/// Minimal markdown: `**bold**`, `*italic*`, `- ` bullets and numbered
/// lines. Markers without a closing partner on the same line stay literal.
pub fn render_markdown(text: &str) -> RichText {
    let lines = text
        .split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(rest) = line.strip_prefix("- ") {
                let mut spans = vec![Span {
                    style: SpanStyle::Plain,
                    text: "• ".to_owned(),
                }];
                spans.extend(parse_inline(rest));
                return RichLine {
                    kind: LineKind::Bullet,
                    spans: merge_plain(spans),
                };
            }
            let kind = if is_numbered(line) {
                LineKind::Numbered
            } else {
                LineKind::Plain
            };
            RichLine {
                kind,
                spans: parse_inline(line),
            }
        })
        .collect();
    RichText { lines }
}

fn is_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**")
            && let Some(end) = after.find("**")
        {
            flush_plain(&mut spans, &mut plain);
            spans.push(Span {
                style: SpanStyle::Bold,
                text: after[..end].to_owned(),
            });
            rest = &after[end + 2..];
            continue;
        }
        if let Some(after) = rest.strip_prefix('*')
            && !after.starts_with('*')
            && let Some(end) = after.find('*')
        {
            flush_plain(&mut spans, &mut plain);
            spans.push(Span {
                style: SpanStyle::Italic,
                text: after[..end].to_owned(),
            });
            rest = &after[end + 1..];
            continue;
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            plain.push(ch);
        }
        rest = chars.as_str();
    }
    flush_plain(&mut spans, &mut plain);
    spans
}

fn flush_plain(spans: &mut Vec<Span>, plain: &mut String) {
    if !plain.is_empty() {
        spans.push(Span {
            style: SpanStyle::Plain,
            text: std::mem::take(plain),
        });
    }
}

fn merge_plain(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.style == SpanStyle::Plain && span.style == SpanStyle::Plain => {
                last.text.push_str(&span.text);
            }
            _ => merged.push(span),
        }
    }
    merged
}
