//! Reduces an HTML-to-text rendered message body to its first message block.
//!
//! The pipeline is a fixed, ordered list of [`Stage`]s. Each stage is a plain
//! `&str -> String` function so it can be exercised on its own. [`clean`]
//! repeats the removal stages until the text settles, then runs the line
//! stages once. Every stage is total: unmatched or malformed markup is left
//! as-is rather than rejected.

use regex::Regex;
use std::sync::LazyLock;

static RE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\s*\([^)]*\)").expect("valid image regex"));
static RE_IMAGE_BROKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^)]*\)").expect("valid broken image regex"));
static RE_IMAGE_EMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\s*\](?:\s*\(\s*\))?").expect("valid empty image regex"));
static RE_IMAGE_UNCLOSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)\s]*").expect("valid unclosed image regex"));

static RE_LINK_ANGLED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\[[^\]]*\]\([^)]*\)>").expect("valid angled link regex"));
static RE_LINK_MAILTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]\([^)]*mailto:[^)]*\)").expect("valid mailto link regex")
});
static RE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("valid link regex"));

static RE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*@[^>]*>").expect("valid address regex"));

static RE_HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:Кому|Тема|From|To|Date|Sent):.*$").expect("valid header regex")
});
static RE_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}\.\d{2}\.\d{4},\s*\d{2}:\d{2}.*").expect("valid stamp regex")
});

static RE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-–=]{3,}\s*$").expect("valid separator regex"));

static RE_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}")
        .expect("valid uuid regex")
});
static RE_QUERY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&[a-z0-9]+=[^&\s]*").expect("valid query regex"));
static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]*").expect("valid url regex"));

// A line matching this starts the quoted history of the thread.
static RE_QUOTE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)написал|:.*<.*@.*>|^\d{2}\.\d{2}\.\d{4}|^>").expect("valid quote regex")
});

// Same separators as Python's `str.splitlines`, `\r\n` counting once.
static RE_LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|[\n\r\x0b\x0c\x1c\x1d\x1e\x{85}\x{2028}\x{2029}]")
        .expect("valid line break regex")
});

static RE_SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid space regex"));
static RE_NEWLINE_PAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("valid newline regex"));

/// One named text transformation in the cleaning pipeline.
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// Stages in the order [`clean`] applies them. Reordering changes results.
/// The first [`REMOVAL_STAGES`] only delete text; the rest work on lines.
pub const PIPELINE: [Stage; 9] = [
    Stage { name: "images", apply: strip_images },
    Stage { name: "links", apply: strip_links },
    Stage { name: "addresses", apply: strip_addresses },
    Stage { name: "headers", apply: strip_header_lines },
    Stage { name: "separators", apply: strip_separators },
    Stage { name: "artifacts", apply: strip_artifacts },
    Stage { name: "blank_lines", apply: drop_blank_lines },
    Stage { name: "quotes", apply: truncate_at_quote },
    Stage { name: "whitespace", apply: collapse_whitespace },
];

/// Clean an email body for use in a prompt.
///
/// Keeps only the text before the first recognisable reply/forward marker,
/// with Markdown images, links, bracketed addresses, header lines, rules and
/// tracking leftovers removed. Empty input gives an empty string.
pub fn clean(raw: &str) -> String {
    let (removal, lines) = PIPELINE.split_at(REMOVAL_STAGES);

    // Deleting one token can splice its neighbours into a new match, so the
    // removal stages run until they no longer change anything.
    let mut text = raw.to_string();
    loop {
        let next = run(removal, &text);
        if next == text {
            break;
        }
        text = next;
    }
    run(lines, &text)
}

/// Number of leading [`PIPELINE`] stages that only delete text.
pub const REMOVAL_STAGES: usize = 6;

fn run(stages: &[Stage], text: &str) -> String {
    stages
        .iter()
        .fold(text.to_string(), |text, stage| (stage.apply)(&text))
}

/// `![alt](url)`, its truncated forms (no `]`, no `)`) and the empty `![]()`.
pub fn strip_images(text: &str) -> String {
    let text = RE_IMAGE.replace_all(text, "");
    let text = RE_IMAGE_BROKEN.replace_all(&text, "");
    let text = RE_IMAGE_EMPTY.replace_all(&text, "");
    RE_IMAGE_UNCLOSED.replace_all(&text, "").into_owned()
}

/// Markdown links, anchor text included.
pub fn strip_links(text: &str) -> String {
    let text = RE_LINK_ANGLED.replace_all(text, "");
    let text = RE_LINK_MAILTO.replace_all(&text, "");
    RE_LINK.replace_all(&text, "").into_owned()
}

pub fn strip_addresses(text: &str) -> String {
    RE_ADDRESS.replace_all(text, "").into_owned()
}

/// Quoted header lines (`From:`, `Кому:`, ...) and `DD.MM.YYYY, HH:MM` stamps.
pub fn strip_header_lines(text: &str) -> String {
    let text = RE_HEADER_LINE.replace_all(text, "");
    RE_STAMP.replace_all(&text, "").into_owned()
}

pub fn strip_separators(text: &str) -> String {
    RE_SEPARATOR.replace_all(text, "").into_owned()
}

/// UUIDs, `&key=value` fragments and whatever URLs survived the link stage.
pub fn strip_artifacts(text: &str) -> String {
    let text = RE_UUID.replace_all(text, "");
    let text = RE_QUERY_PARAM.replace_all(&text, "");
    RE_URL.replace_all(&text, "").into_owned()
}

/// Lines as `str.splitlines` sees them: CR-only and Unicode breaks count.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = RE_LINE_BREAK.split(text).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

pub fn drop_blank_lines(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep lines up to, not including, the first one that opens a quote.
pub fn truncate_at_quote(text: &str) -> String {
    split_lines(text)
        .into_iter()
        .take_while(|line| !RE_QUOTE_START.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn collapse_whitespace(text: &str) -> String {
    let text = RE_SPACE_RUN.replace_all(text, " ");
    RE_NEWLINE_PAD.replace_all(&text, "\n").trim().to_string()
}
