//! Markdown compiler - parses a source string into builder calls.
//!
//! Covers headings, paragraphs, unordered and ordered lists, fenced code
//! blocks, inline code/emphasis/strong, and `{{name}}` placeholders for
//! embedded components. Interacts with the core only through the builder
//! surface; styling goes through theme tokens.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::builder::{container, keyed, text};
use crate::theme::ThemeToken;
use crate::types::{Attr, FlexDirection, FlexWrap};

// =============================================================================
// Block model
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Bullets(Vec<String>),
    Numbered(Vec<String>),
    Code { lang: Option<String>, body: String },
    /// `{{name}}` on a line of its own: an embedded component slot.
    Placeholder(String),
}

/// Parse a markdown source into its block sequence.
pub fn parse_blocks(source: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut bullets: Vec<String> = Vec::new();
    let mut numbered: Vec<String> = Vec::new();
    let mut code: Option<(Option<String>, Vec<&str>)> = None;

    fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    }
    fn flush_lists(bullets: &mut Vec<String>, numbered: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !bullets.is_empty() {
            blocks.push(Block::Bullets(std::mem::take(bullets)));
        }
        if !numbered.is_empty() {
            blocks.push(Block::Numbered(std::mem::take(numbered)));
        }
    }

    for line in source.lines() {
        let trimmed = line.trim_end();

        // Inside a fence everything is literal until the closing fence.
        if let Some((lang, body)) = &mut code {
            if trimmed.trim_start().starts_with("```") {
                blocks.push(Block::Code {
                    lang: lang.clone(),
                    body: body.join("\n"),
                });
                code = None;
            } else {
                body.push(line);
            }
            continue;
        }

        let stripped = trimmed.trim_start();

        if let Some(rest) = stripped.strip_prefix("```") {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_lists(&mut bullets, &mut numbered, &mut blocks);
            let lang = rest.trim();
            code = Some((
                (!lang.is_empty()).then(|| lang.to_string()),
                Vec::new(),
            ));
            continue;
        }

        if stripped.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_lists(&mut bullets, &mut numbered, &mut blocks);
            continue;
        }

        // Headings: one to six hashes, then a space.
        let hashes = stripped.bytes().take_while(|&b| b == b'#').count();
        if (1..=6).contains(&hashes) && stripped.as_bytes().get(hashes) == Some(&b' ') {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_lists(&mut bullets, &mut numbered, &mut blocks);
            blocks.push(Block::Heading {
                level: hashes as u8,
                text: stripped[hashes + 1..].trim().to_string(),
            });
            continue;
        }

        // Component placeholder alone on a line.
        if let Some(inner) = stripped
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
        {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_lists(&mut bullets, &mut numbered, &mut blocks);
            blocks.push(Block::Placeholder(inner.trim().to_string()));
            continue;
        }

        if let Some(item) = stripped.strip_prefix("- ").or_else(|| stripped.strip_prefix("* ")) {
            flush_paragraph(&mut paragraph, &mut blocks);
            if !numbered.is_empty() {
                blocks.push(Block::Numbered(std::mem::take(&mut numbered)));
            }
            bullets.push(item.trim().to_string());
            continue;
        }

        let digits = stripped.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 && stripped[digits..].starts_with(". ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            if !bullets.is_empty() {
                blocks.push(Block::Bullets(std::mem::take(&mut bullets)));
            }
            numbered.push(stripped[digits + 2..].trim().to_string());
            continue;
        }

        flush_lists(&mut bullets, &mut numbered, &mut blocks);
        paragraph.push(stripped);
    }

    // Unterminated fence renders as code anyway.
    if let Some((lang, body)) = code {
        blocks.push(Block::Code {
            lang,
            body: body.join("\n"),
        });
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    flush_lists(&mut bullets, &mut numbered, &mut blocks);

    blocks
}

// =============================================================================
// Inline model
// =============================================================================

/// One run of inline text with uniform attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub text: String,
    pub attrs: Attr,
}

/// Split inline markup into attribute runs: `**strong**`, `*emphasis*`,
/// `` `code` ``. Unterminated markers render literally.
pub fn parse_inline(source: &str) -> Vec<InlineRun> {
    let mut runs: Vec<InlineRun> = Vec::new();
    let mut plain = String::new();
    let mut rest = source;

    fn push_run(runs: &mut Vec<InlineRun>, text: &str, attrs: Attr) {
        if !text.is_empty() {
            runs.push(InlineRun {
                text: text.to_string(),
                attrs,
            });
        }
    }

    while !rest.is_empty() {
        let markers: [(&str, Attr); 3] = [
            ("**", Attr::BOLD),
            ("*", Attr::ITALIC),
            ("`", Attr::MONOSPACE),
        ];
        let mut matched = false;
        for (marker, attrs) in markers {
            if let Some(after) = rest.strip_prefix(marker) {
                if let Some(end) = after.find(marker) {
                    push_run(&mut runs, &plain, Attr::NONE);
                    plain.clear();
                    push_run(&mut runs, &after[..end], attrs);
                    rest = &after[end + marker.len()..];
                    matched = true;
                    break;
                }
            }
        }
        if matched {
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            plain.push(c);
            rest = chars.as_str();
        }
    }
    push_run(&mut runs, &plain, Attr::NONE);
    runs
}

// =============================================================================
// Rendering
// =============================================================================

const HEADING_SIZES: [u16; 6] = [32, 28, 24, 20, 18, 16];

fn render_runs(runs: &[InlineRun]) {
    container()
        .direction(FlexDirection::Row)
        .wrap(FlexWrap::Wrap)
        .children(|| {
            for run in runs {
                if run.attrs.contains(Attr::MONOSPACE) {
                    text(run.text.as_str())
                        .attrs(run.attrs)
                        .bg(ThemeToken::Surface)
                        .fg(ThemeToken::Accent)
                        .end();
                } else {
                    text(run.text.as_str()).attrs(run.attrs).end();
                }
            }
        });
}

fn render_block(block: &Block, components: &FxHashMap<String, Rc<dyn Fn()>>) {
    match block {
        Block::Heading { level, text: t } => {
            let size = HEADING_SIZES[(*level as usize - 1).min(5)];
            text(t.as_str())
                .font_size(size)
                .attrs(Attr::BOLD)
                .fg(ThemeToken::Text)
                .end();
        }
        Block::Paragraph(body) => render_runs(&parse_inline(body)),
        Block::Bullets(items) => {
            container().gap(2u16).children(|| {
                for (i, item) in items.iter().enumerate() {
                    keyed(format!("li{i}"), || {
                        container()
                            .direction(FlexDirection::Row)
                            .gap(4u16)
                            .children(|| {
                                text("\u{2022}").fg(ThemeToken::TextMuted).end();
                                render_runs(&parse_inline(item));
                            });
                    });
                }
            });
        }
        Block::Numbered(items) => {
            container().gap(2u16).children(|| {
                for (i, item) in items.iter().enumerate() {
                    keyed(format!("oi{i}"), || {
                        container()
                            .direction(FlexDirection::Row)
                            .gap(4u16)
                            .children(|| {
                                text(format!("{}.", i + 1)).fg(ThemeToken::TextMuted).end();
                                render_runs(&parse_inline(item));
                            });
                    });
                }
            });
        }
        Block::Code { body, .. } => {
            container()
                .bg(ThemeToken::Surface)
                .padding(8u16)
                .radius(4u16)
                .children(|| {
                    for (i, line) in body.lines().enumerate() {
                        keyed(format!("cl{i}"), || {
                            text(line).attrs(Attr::MONOSPACE).fg(ThemeToken::Text).end();
                        });
                    }
                });
        }
        Block::Placeholder(name) => match components.get(name) {
            Some(component) => component(),
            None => {
                log::warn!("markdown placeholder `{{{{{name}}}}}` has no component bound");
            }
        },
    }
}

/// Render a markdown string through the builder surface.
pub fn markdown(source: &str) {
    markdown_with(source, &FxHashMap::default());
}

/// Render markdown with components bound to `{{name}}` placeholders.
pub fn markdown_with(source: &str, components: &FxHashMap<String, Rc<dyn Fn()>>) {
    let blocks = parse_blocks(source);
    container().gap(8u16).children(|| {
        for (i, block) in blocks.iter().enumerate() {
            keyed(format!("md{i}"), || render_block(block, components));
        }
    });
}

// =============================================================================
// Tests
// =============================================================================
