//! Normalization: deterministic cleanup of OCR-generated Markdown.
//!
//! The layout-parsing service emits Markdown assembled region by region, so
//! its output drifts in small structural ways from page to page: CRLF line
//! endings from Windows-built models, `*` and `+` bullets mixed with `-`,
//! headings glued to the previous paragraph, runs of empty lines where
//! regions were dropped, tables whose separator row was lost.
//!
//! [`normalize_markdown`] runs once per document before assembly so every
//! document in a batch ends up in the same canonical shape. Each rule is a
//! pure `&str → String` pass and is tested on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can split on `\n`.
//! Heading and table rules run before blank-line collapsing because both may
//! insert blank lines of their own.
//!
//! ## Fenced Code
//!
//! Fenced blocks (three or more backticks or tildes, closed by a run of the
//! same marker at least as long) are recognised text too, and are left
//! byte-for-byte alone. Before rules 3–8 each block is swapped for a
//! one-line token and swapped back afterwards.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalization rules to one document's raw text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Unify bullet markers (`*`, `+` → `-`)
/// 5. Surround heading lines with blank lines
/// 6. Insert a missing GFM table separator row
/// 7. Remove spurious mid-table separator rows
/// 8. Collapse runs of blank lines down to one
/// 9. Ensure the text ends with exactly one newline
///
/// Rules 3–8 skip the contents of fenced code blocks.
pub fn normalize_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let (s, fenced) = stash_fenced_blocks(&s);
    let s = trim_trailing_whitespace(&s);
    let s = unify_bullets(&s);
    let s = normalise_heading_spacing(&s);
    let s = fix_broken_tables(&s);
    let s = remove_mid_table_separators(&s);
    let s = collapse_blank_lines(&s);
    let s = restore_fenced_blocks(&s, &fenced);
    ensure_final_newline(&s)
}

// ── Fenced code blocks ───────────────────────────────────────────────────────

/// Private-use delimiter of the stand-in line for a stashed block.
const FENCE_TOKEN: char = '\u{E000}';

struct Fence {
    marker: char,
    len: usize,
}

/// Up to three spaces of indentation, as CommonMark allows for fences.
fn strip_fence_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(' ');
    (line.len() - rest.len() <= 3).then_some(rest)
}

fn fence_opener(line: &str) -> Option<Fence> {
    let rest = strip_fence_indent(line)?;
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    // A backtick info string may not itself contain backticks.
    if marker == '`' && rest[len..].contains('`') {
        return None;
    }
    Some(Fence { marker, len })
}

fn closes_fence(fence: &Fence, line: &str) -> bool {
    let Some(rest) = strip_fence_indent(line) else {
        return false;
    };
    let len = rest.chars().take_while(|c| *c == fence.marker).count();
    len >= fence.len && rest[len..].trim().is_empty()
}

/// Replace every fenced block with a token line; an unclosed fence runs to
/// the end of the text.
fn stash_fenced_blocks(input: &str) -> (String, Vec<String>) {
    let mut prose: Vec<String> = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let Some(fence) = fence_opener(line) else {
            prose.push(line.to_string());
            continue;
        };
        let mut block = vec![line];
        for inner in lines.by_ref() {
            block.push(inner);
            if closes_fence(&fence, inner) {
                break;
            }
        }
        prose.push(format!("{FENCE_TOKEN}{}{FENCE_TOKEN}", blocks.len()));
        blocks.push(block.join("\n"));
    }

    if blocks.is_empty() {
        return (input.to_string(), blocks);
    }
    (prose.join("\n"), blocks)
}

fn restore_fenced_blocks(input: &str, blocks: &[String]) -> String {
    if blocks.is_empty() {
        return input.to_string();
    }
    input
        .lines()
        .map(|line| {
            line.strip_prefix(FENCE_TOKEN)
                .and_then(|l| l.strip_suffix(FENCE_TOKEN))
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| blocks.get(n))
                .map_or(line, |block| block.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Unify bullet markers ─────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)[*+]([ \t]+\S.*)$").unwrap());

fn unify_bullets(input: &str) -> String {
    RE_BULLET
        .replace_all(input, |caps: &regex::Captures<'_>| {
            // `* * *` is a thematic break, not a list item.
            let rest = &caps[2];
            if rest.chars().all(|c| c == '*' || c == ' ' || c == '\t') {
                caps[0].to_string()
            } else {
                format!("{}-{}", &caps[1], rest)
            }
        })
        .to_string()
}

// ── Rule 5: Heading spacing ──────────────────────────────────────────────────

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn normalise_heading_spacing(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result: Vec<&str> = Vec::with_capacity(lines.len() + 16);

    for (i, line) in lines.iter().enumerate() {
        if is_heading(line) && result.last().is_some_and(|prev| !prev.is_empty()) {
            result.push("");
        }
        result.push(line);
        let next_is_text = lines.get(i + 1).is_some_and(|next| !next.is_empty());
        if is_heading(line) && next_is_text {
            result.push("");
        }
    }

    result.join("\n")
}

// ── Rule 6: Fix broken GFM tables ───────────────────────────────────────────

/// Ensures the first row of every table block is followed by a separator row.
fn fix_broken_tables(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result = Vec::with_capacity(lines.len() + 10);
    let mut prev_is_table = false;

    for (i, line) in lines.iter().enumerate() {
        result.push(line.to_string());
        let is_row = is_table_row(line);

        if is_row && !prev_is_table && !is_separator_row(line) {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if is_table_row(next) && !is_separator_row(next) {
                let col_count = line.trim().matches('|').count().saturating_sub(1).max(1);
                let sep: String = std::iter::once("|")
                    .chain(std::iter::repeat_n(" --- |", col_count))
                    .collect();
                result.push(sep);
            }
        }
        prev_is_table = is_row;
    }

    result.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') || !trimmed.contains('-') {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

// ── Rule 7: Remove spurious mid-table separator rows ───────────────────────
//
// GFM only allows a separator in position 2 (after the header row). Region
// stitching sometimes repeats it where a table continued across regions.

fn remove_mid_table_separators(input: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut table_line_count = 0usize;

    for line in input.lines() {
        if is_table_row(line) {
            table_line_count += 1;
            if is_separator_row(line) && table_line_count != 2 {
                continue;
            }
        } else {
            table_line_count = 0;
        }
        result.push(line);
    }

    result.join("\n")
}

// ── Rule 8: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 9: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
