//! Constrained markdown-to-rich-content rendering.
//!
//! # Responsibility
//! - Convert raw note text into display-ready markup for view mode.
//! - Cover the fixed dialect only: headers (1-3), fenced/inline code, bold,
//!   italic, strikethrough, links, lists, block quotes, horizontal rules and
//!   line breaks.
//!
//! # Invariants
//! - HTML-sensitive characters are escaped before any tag injection.
//! - Code content is extracted before inline markup matching, so markup
//!   characters inside code are never reinterpreted.
//! - Consecutive list items collapse into one enclosing list.
//! - Output is always recomputed from raw source; malformed markup degrades
//!   to best-effort output and never fails.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\n?(.*?)\n?```").expect("valid fenced code regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code regex"));
static BOLD_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static BOLD_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_]+)__").expect("valid bold underscore regex"));
static ITALIC_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid italic regex"));
static ITALIC_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([^_\n]+)_").expect("valid italic underscore regex"));
static STRIKETHROUGH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~(.+?)~~").expect("valid strikethrough regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("valid link regex"));
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").expect("valid header regex"));
static UNORDERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*]\s+(.*)$").expect("valid unordered item regex"));
static ORDERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+(.*)$").expect("valid ordered item regex"));
static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&gt;\s?(.*)$").expect("valid quote regex"));
static HORIZONTAL_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:-{3,}|\*{3,})\s*$").expect("valid rule regex"));
static BREAK_BEFORE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:<br>)+(<(?:pre|h[1-3]|ul|ol|blockquote|hr)[ >])")
        .expect("valid break-before-block regex")
});
static BREAK_AFTER_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(</(?:pre|h[1-3]|ul|ol|blockquote)>|<hr>)(?:<br>)+")
        .expect("valid break-after-block regex")
});

/// Sentinel wrapping stashed code fragments while inline markup runs.
const STASH_MARK: char = '\u{1}';

/// Renders raw note text into display-ready markup.
///
/// Best-effort line-oriented transform, not a parser: no AST, no nesting
/// beyond what the fixed substitution order produces. Unbalanced delimiters
/// yield undefined formatting but never an error.
pub fn render(text: &str) -> String {
    let escaped = escape_html(text);

    let mut stash: Vec<String> = Vec::new();
    let text = extract_code(&escaped, &mut stash);
    let text = apply_inline(&text);
    let text = assemble_blocks(&text);
    let text = reinsert_code(&text, &stash);

    let text = BREAK_BEFORE_BLOCK_RE.replace_all(&text, "$1");
    BREAK_AFTER_BLOCK_RE.replace_all(&text, "$1").into_owned()
}

/// Escapes the three HTML-sensitive characters. Must run before every other
/// substitution.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Pulls fenced blocks and inline spans out into the stash, leaving sentinel
/// tokens behind so later passes cannot touch code content.
fn extract_code(text: &str, stash: &mut Vec<String>) -> String {
    let text = FENCED_CODE_RE.replace_all(text, |caps: &Captures<'_>| {
        let token = format!("{STASH_MARK}{}{STASH_MARK}", stash.len());
        stash.push(format!("<pre><code>{}</code></pre>", &caps[1]));
        token
    });
    INLINE_CODE_RE
        .replace_all(&text, |caps: &Captures<'_>| {
            let token = format!("{STASH_MARK}{}{STASH_MARK}", stash.len());
            stash.push(format!("<code>{}</code>", &caps[1]));
            token
        })
        .into_owned()
}

/// Inline span substitutions: bold before italic so `**` is not consumed as
/// two italic markers.
fn apply_inline(text: &str) -> String {
    let text = BOLD_STAR_RE.replace_all(text, "<b>$1</b>");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "<b>$1</b>");
    let text = ITALIC_STAR_RE.replace_all(&text, "<i>$1</i>");
    let text = ITALIC_UNDERSCORE_RE.replace_all(&text, "<i>$1</i>");
    let text = STRIKETHROUGH_RE.replace_all(&text, "<s>$1</s>");
    LINK_RE
        .replace_all(
            &text,
            "<a href=\"$2\" target=\"_blank\" rel=\"noopener\">$1</a>",
        )
        .into_owned()
}

#[derive(PartialEq)]
enum ListRun {
    None,
    Unordered,
    Ordered,
}

/// Line pass for block structure: headers, list consolidation, quotes and
/// rules. Plain lines are joined with `<br>`; block output is not.
fn assemble_blocks(text: &str) -> String {
    let mut out = String::new();
    let mut run = ListRun::None;
    let mut needs_break = false;

    for line in text.lines() {
        if let Some(caps) = UNORDERED_ITEM_RE.captures(line) {
            switch_run(&mut out, &mut run, ListRun::Unordered);
            out.push_str("<li>");
            out.push_str(&caps[1]);
            out.push_str("</li>");
            needs_break = false;
            continue;
        }
        if let Some(caps) = ORDERED_ITEM_RE.captures(line) {
            switch_run(&mut out, &mut run, ListRun::Ordered);
            out.push_str("<li>");
            out.push_str(&caps[1]);
            out.push_str("</li>");
            needs_break = false;
            continue;
        }

        switch_run(&mut out, &mut run, ListRun::None);

        if let Some(caps) = HEADER_RE.captures(line) {
            let level = caps[1].len();
            out.push_str(&format!("<h{level}>{}</h{level}>", &caps[2]));
            needs_break = false;
        } else if HORIZONTAL_RULE_RE.is_match(line) {
            out.push_str("<hr>");
            needs_break = false;
        } else if let Some(caps) = QUOTE_RE.captures(line) {
            out.push_str(&format!("<blockquote>{}</blockquote>", &caps[1]));
            needs_break = false;
        } else {
            if needs_break {
                out.push_str("<br>");
            }
            out.push_str(line);
            needs_break = true;
        }
    }

    switch_run(&mut out, &mut run, ListRun::None);
    out
}

/// Closes/opens list containers so consecutive items of one kind share a
/// single enclosing list.
fn switch_run(out: &mut String, run: &mut ListRun, next: ListRun) {
    if *run == next {
        return;
    }
    match run {
        ListRun::Unordered => out.push_str("</ul>"),
        ListRun::Ordered => out.push_str("</ol>"),
        ListRun::None => {}
    }
    match next {
        ListRun::Unordered => out.push_str("<ul>"),
        ListRun::Ordered => out.push_str("<ol>"),
        ListRun::None => {}
    }
    *run = next;
}

/// Replaces stash sentinels with the protected code markup.
fn reinsert_code(text: &str, stash: &[String]) -> String {
    let mut out = text.to_string();
    for (index, fragment) in stash.iter().enumerate() {
        let token = format!("{STASH_MARK}{index}{STASH_MARK}");
        out = out.replace(&token, fragment);
    }
    out
}
