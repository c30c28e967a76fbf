//! HTML reader and writer for [`RichDocument`].
//!
//! The writer emits one `<p>` (or `<h1>`..`<h6>`) per block and one `<span>`
//! per run of identically formatted characters. Block structure the CSS
//! vocabulary cannot express travels in `data-*` attributes:
//!
//! ```text
//! <p style="text-align:center" data-list="0" data-list-style="disc"
//!    data-list-indent="1" data-checked="false">
//!   <span style="font-weight:bold" data-family="Serif">text</span>
//! </p>
//! ```
//!
//! The reader accepts that subset. Markup without any block elements is
//! treated as plain text with the tags stripped.

use crate::document::{Glyph, RichDocument};
use crate::format::{Alignment, BlockFormat, CharFormat, List, ListId, ListStyle, Rgba};
use std::collections::BTreeMap;
use std::fmt::Write;
use thiserror::Error;

/// Pixels of left margin per indent level.
pub const INDENT_WIDTH_PX: u32 = 40;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HtmlError {
    #[error("Unterminated tag starting at byte {offset}")]
    UnterminatedTag { offset: usize },
    #[error("Unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },
    #[error("Invalid value '{value}' for attribute '{name}'")]
    InvalidAttribute { name: String, value: String },
}

pub fn to_html(doc: &RichDocument) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n",
    );
    for (index, block) in doc.blocks().iter().enumerate() {
        let tag = match block.heading {
            Some(level) => format!("h{}", level),
            None => "p".to_string(),
        };
        out.push('<');
        out.push_str(&tag);
        write_block_attrs(&mut out, doc, block);
        out.push('>');
        if let Some(range) = doc.block_range(index) {
            write_runs(&mut out, &doc.glyphs()[range]);
        }
        let _ = writeln!(out, "</{}>", tag);
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn write_block_attrs(out: &mut String, doc: &RichDocument, block: &BlockFormat) {
    let mut style = Vec::new();
    if block.alignment != Alignment::Left {
        style.push(format!("text-align:{}", block.alignment.css()));
    }
    if block.indent > 0 {
        style.push(format!("margin-left:{}px", block.indent * INDENT_WIDTH_PX));
    }
    if !style.is_empty() {
        let _ = write!(out, " style=\"{}\"", style.join("; "));
    }
    if let Some(id) = block.list {
        if let Some(list) = doc.list(id) {
            let _ = write!(
                out,
                " data-list=\"{}\" data-list-style=\"{}\" data-list-indent=\"{}\"",
                id.0,
                list.style.css(),
                list.indent
            );
        }
    }
    if let Some(checked) = block.checked {
        let _ = write!(out, " data-checked=\"{}\"", checked);
    }
}

fn write_runs(out: &mut String, glyphs: &[Glyph]) {
    let mut start = 0;
    while start < glyphs.len() {
        let format = &glyphs[start].format;
        let end = glyphs[start..]
            .iter()
            .position(|g| g.format != *format)
            .map(|n| start + n)
            .unwrap_or(glyphs.len());
        let text: String = glyphs[start..end].iter().map(|g| g.ch).collect();
        if format.is_empty() {
            out.push_str(&escape(&text, false));
        } else {
            out.push_str("<span");
            write_span_attrs(out, format);
            out.push('>');
            out.push_str(&escape(&text, false));
            out.push_str("</span>");
        }
        start = end;
    }
}

fn write_span_attrs(out: &mut String, format: &CharFormat) {
    let mut style = Vec::new();
    if let Some(bold) = format.bold {
        style.push(format!("font-weight:{}", if bold { "bold" } else { "normal" }));
    }
    if let Some(italic) = format.italic {
        style.push(format!("font-style:{}", if italic { "italic" } else { "normal" }));
    }
    if let Some(underline) = format.underline {
        style.push(format!(
            "text-decoration:{}",
            if underline { "underline" } else { "none" }
        ));
    }
    if let Some(color) = format.foreground {
        style.push(format!("color:{}", color));
    }
    if let Some(color) = format.underline_color {
        style.push(format!("text-decoration-color:{}", color));
    }
    if let Some(size) = format.point_size {
        style.push(format!("font-size:{}pt", size));
    }
    if !style.is_empty() {
        let _ = write!(out, " style=\"{}\"", style.join("; "));
    }
    if let Some(family) = &format.family {
        let _ = write!(out, " data-family=\"{}\"", escape(family, true));
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug)]
enum Token<'a> {
    Open { name: String, attrs: Vec<(String, String)> },
    Close { name: String },
    Text(&'a str),
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>, HtmlError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let rest = &input[pos..];
        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            tokens.push(Token::Text(&rest[..end]));
            pos += end;
            continue;
        }
        if rest.starts_with("<!--") {
            let end = rest
                .find("-->")
                .ok_or(HtmlError::UnterminatedComment { offset: pos })?;
            pos += end + 3;
            continue;
        }
        let end = rest
            .find('>')
            .ok_or(HtmlError::UnterminatedTag { offset: pos })?;
        let inner = &rest[1..end];
        pos += end + 1;
        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::Close { name: name.trim().to_ascii_lowercase() });
            continue;
        }
        let inner = inner.trim_end_matches('/');
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        tokens.push(Token::Open {
            name: inner[..name_end].to_ascii_lowercase(),
            attrs: parse_attrs(&inner[name_end..]),
        });
    }
    Ok(tokens)
}

fn parse_attrs(mut s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            return attrs;
        }
        let key_end = s
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(s.len());
        let key = s[..key_end].to_ascii_lowercase();
        s = s[key_end..].trim_start();
        let Some(after_eq) = s.strip_prefix('=') else {
            attrs.push((key, String::new()));
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, rest) = match after_eq.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(quote) {
                    Some(close) => (&body[..close], &body[close + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        attrs.push((key, unescape(value)));
        s = rest;
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn style_props(attrs: &[(String, String)]) -> Vec<(String, String)> {
    attr(attrs, "style")
        .map(|style| {
            style
                .split(';')
                .filter_map(|decl| {
                    let (key, value) = decl.split_once(':')?;
                    Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn invalid(name: &str, value: &str) -> HtmlError {
    HtmlError::InvalidAttribute { name: name.to_string(), value: value.to_string() }
}

fn heading_level(name: &str) -> Option<u8> {
    match name.strip_prefix('h')?.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

fn is_block(name: &str) -> bool {
    name == "p" || heading_level(name).is_some()
}

fn is_skipped(name: &str) -> bool {
    matches!(name, "head" | "title" | "style" | "script")
}

fn parse_block(
    name: &str,
    attrs: &[(String, String)],
    lists: &mut BTreeMap<ListId, List>,
) -> Result<BlockFormat, HtmlError> {
    let mut block = BlockFormat { heading: heading_level(name), ..BlockFormat::default() };
    for (key, value) in style_props(attrs) {
        match key.as_str() {
            "text-align" => {
                if let Some(alignment) = Alignment::from_css(&value) {
                    block.alignment = alignment;
                }
            }
            "margin-left" => {
                if let Ok(px) = value.trim_end_matches("px").trim().parse::<u32>() {
                    block.indent = px / INDENT_WIDTH_PX;
                }
            }
            _ => {}
        }
    }
    if let Some(raw) = attr(attrs, "data-list") {
        let id = ListId(raw.parse().map_err(|_| invalid("data-list", raw))?);
        let style = match attr(attrs, "data-list-style") {
            Some(css) => ListStyle::from_css(css).ok_or_else(|| invalid("data-list-style", css))?,
            None => ListStyle::Disc,
        };
        let indent = match attr(attrs, "data-list-indent") {
            Some(raw) => raw.parse().map_err(|_| invalid("data-list-indent", raw))?,
            None => 1,
        };
        lists.entry(id).or_insert(List { style, indent });
        block.list = Some(id);
    }
    if let Some(raw) = attr(attrs, "data-checked") {
        block.checked = Some(raw.parse().map_err(|_| invalid("data-checked", raw))?);
    }
    Ok(block)
}

fn parse_span(attrs: &[(String, String)]) -> CharFormat {
    let mut format = CharFormat::default();
    for (key, value) in style_props(attrs) {
        match key.as_str() {
            "font-weight" => {
                format.bold = match value.as_str() {
                    "bold" | "bolder" => Some(true),
                    "normal" | "lighter" => Some(false),
                    numeric => numeric.parse::<u32>().ok().map(|w| w >= 600),
                }
            }
            "font-style" => format.italic = Some(value == "italic" || value == "oblique"),
            "text-decoration" | "text-decoration-line" => {
                format.underline = Some(value.contains("underline"))
            }
            "color" => format.foreground = Rgba::parse_hex(&value).or(format.foreground),
            "text-decoration-color" => {
                format.underline_color = Rgba::parse_hex(&value).or(format.underline_color)
            }
            "font-size" => {
                if let Ok(size) = value.trim_end_matches("pt").trim().parse() {
                    format.point_size = Some(size);
                }
            }
            _ => {}
        }
    }
    if let Some(family) = attr(attrs, "data-family") {
        format.family = Some(family.to_string());
    }
    format
}

pub fn from_html(input: &str) -> Result<RichDocument, HtmlError> {
    let tokens = tokenize(input)?;
    let structured = tokens
        .iter()
        .any(|t| matches!(t, Token::Open { name, .. } if is_block(name)));
    if !structured {
        return Ok(plain_fallback(input, &tokens));
    }

    let mut glyphs: Vec<Glyph> = Vec::new();
    let mut blocks: Vec<BlockFormat> = Vec::new();
    let mut lists = BTreeMap::new();
    let mut formats = vec![CharFormat::default()];
    let mut in_block = false;
    let mut skip_depth = 0usize;

    for token in &tokens {
        match token {
            Token::Open { name, .. } if is_skipped(name) => skip_depth += 1,
            Token::Close { name } if is_skipped(name) => skip_depth = skip_depth.saturating_sub(1),
            _ if skip_depth > 0 => {}
            Token::Open { name, attrs } if is_block(name) => {
                if !blocks.is_empty() {
                    glyphs.push(Glyph::new('\n', CharFormat::default()));
                }
                blocks.push(parse_block(name, attrs, &mut lists)?);
                formats.truncate(1);
                in_block = true;
            }
            Token::Close { name } if is_block(name) => in_block = false,
            Token::Open { name, attrs } if name == "span" => {
                let mut format = formats.last().cloned().unwrap_or_default();
                format.merge(&parse_span(attrs));
                formats.push(format);
            }
            Token::Close { name } if name == "span" => {
                if formats.len() > 1 {
                    formats.pop();
                }
            }
            Token::Open { name, .. } if name == "br" && in_block => {
                let split = blocks.last().cloned().unwrap_or_default();
                glyphs.push(Glyph::new('\n', CharFormat::default()));
                blocks.push(split);
            }
            Token::Text(raw) => {
                if !in_block {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    if !blocks.is_empty() {
                        glyphs.push(Glyph::new('\n', CharFormat::default()));
                    }
                    blocks.push(BlockFormat::default());
                    in_block = true;
                }
                let format = formats.last().cloned().unwrap_or_default();
                for ch in unescape(raw).chars() {
                    let ch = if ch == '\n' { ' ' } else { ch };
                    glyphs.push(Glyph::new(ch, format.clone()));
                }
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        blocks.push(BlockFormat::default());
    }
    Ok(RichDocument::from_parts(glyphs, blocks, lists))
}

fn plain_fallback(input: &str, tokens: &[Token<'_>]) -> RichDocument {
    if tokens.iter().all(|t| matches!(t, Token::Text(_))) {
        return RichDocument::from_plain_text(input);
    }
    let mut text = String::new();
    let mut skip_depth = 0usize;
    for token in tokens {
        match token {
            Token::Open { name, .. } if is_skipped(name) => skip_depth += 1,
            Token::Close { name } if is_skipped(name) => skip_depth = skip_depth.saturating_sub(1),
            Token::Text(raw) if skip_depth == 0 => text.push_str(&unescape(raw)),
            _ => {}
        }
    }
    RichDocument::from_plain_text(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BlockStyle;

    fn sample() -> RichDocument {
        let mut doc = RichDocument::from_plain_text("Title\nfirst <item> & more\nsecond\nplain");
        doc.apply_block_style(0, BlockStyle::Heading1).unwrap();
        doc.merge_char_format(6..11, &CharFormat::bold(true)).unwrap();
        doc.merge_char_format(8..20, &CharFormat::foreground(Rgba::opaque(255, 0, 0)))
            .unwrap();
        doc.merge_char_format(25..31, &CharFormat::family("Noto \"Sans\""))
            .unwrap();
        doc.apply_block_style(1, BlockStyle::TaskUnchecked).unwrap();
        doc.apply_block_style(2, BlockStyle::TaskChecked).unwrap();
        doc.indent(2).unwrap();
        doc.set_alignment(3, Alignment::Justify).unwrap();
        doc.indent(3).unwrap();
        doc
    }

    #[test]
    fn test_roundtrip_preserves_document() {
        let doc = sample();
        let html = to_html(&doc);
        let parsed = from_html(&html).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_writer_escapes_text() {
        let html = to_html(&RichDocument::from_plain_text("a < b && c"));
        assert!(html.contains("<p>a &lt; b &amp;&amp; c</p>"));
    }

    #[test]
    fn test_empty_document_roundtrip() {
        let doc = RichDocument::new();
        assert_eq!(from_html(&to_html(&doc)).unwrap(), doc);
    }

    #[test]
    fn test_unknown_markup_degrades_to_plain_text() {
        let doc = from_html(
            "<html><head><title>ignored</title><style>p{}</style></head>\
             <body><div>Hello <b>world</b> &amp; more</div></body></html>",
        )
        .unwrap();
        assert_eq!(doc.plain_text(), "Hello world & more");
    }

    #[test]
    fn test_untagged_input_is_kept_verbatim() {
        let doc = from_html("line one\nline two\n").unwrap();
        assert_eq!(doc.plain_text(), "line one\nline two\n");
        assert_eq!(doc.block_count(), 3);
    }

    #[test]
    fn test_foreign_css_values() {
        let doc = from_html(
            "<p style='text-align: right'><span style='font-weight: 700; font-size: 14pt'>x</span>\
             <br>y</p>",
        )
        .unwrap();
        assert_eq!(doc.plain_text(), "x\ny");
        let format = doc.char_format_at(0).unwrap();
        assert_eq!(format.bold, Some(true));
        assert_eq!(format.point_size, Some(14));
        assert_eq!(doc.block(1).unwrap().alignment, Alignment::Right);
    }

    #[test]
    fn test_entities() {
        assert_eq!(unescape("&lt;&#65;&#x42;&unknown;&"), "<AB&unknown;&");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            from_html("<p>ok</p><span").unwrap_err(),
            HtmlError::UnterminatedTag { offset: 9 }
        );
        assert!(matches!(
            from_html("<p data-checked=\"maybe\">x</p>"),
            Err(HtmlError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            from_html("<!-- open"),
            Err(HtmlError::UnterminatedComment { offset: 0 })
        ));
    }
}
