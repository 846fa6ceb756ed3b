//! Markdown section parsing.
//!
//! A section starts at an ATX heading and runs until the next heading of the
//! same or a higher level, so it includes its subsections. Headings inside
//! fenced code blocks are ignored. Line numbers are 0-based, `line_end` exclusive.

use crate::utils::hash::compute_hash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One heading-delimited section of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text without the leading `#`s.
    pub heading: String,
    /// Heading level (1-6).
    pub level: usize,
    /// Line of the heading.
    pub line_start: usize,
    /// First line after the section.
    pub line_end: usize,
    /// Hash of the section's lines.
    pub content_hash: String,
}

/// Parse the sections of a document.
pub fn parse_sections(content: &str) -> Vec<Section> {
    let lines: Vec<&str> = content.lines().collect();

    let mut headings: Vec<(usize, usize, String)> = Vec::new();
    let mut in_fence = false;
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((level, heading)) = parse_heading(line) {
            headings.push((idx, level, heading));
        }
    }

    headings
        .iter()
        .enumerate()
        .map(|(i, (start, level, heading))| {
            let end = headings[i + 1..]
                .iter()
                .find(|(_, next_level, _)| next_level <= level)
                .map(|(next_start, _, _)| *next_start)
                .unwrap_or(lines.len());
            Section {
                heading: heading.clone(),
                level: *level,
                line_start: *start,
                line_end: end,
                content_hash: compute_hash(&lines[*start..end].join("\n")),
            }
        })
        .collect()
}

/// Parse an ATX heading line into `(level, text)`.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim();
    if text.is_empty() {
        return None;
    }
    Some((hashes, text.to_string()))
}

/// Normalize a section name for matching: strip `#`s, trim, lowercase.
pub fn normalize_heading(name: &str) -> String {
    name.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Find the first section whose heading matches `name`.
pub fn find_section<'a>(sections: &'a [Section], name: &str) -> Option<&'a Section> {
    let wanted = normalize_heading(name);
    sections
        .iter()
        .find(|s| normalize_heading(&s.heading) == wanted)
}

/// Text of a section, heading line included.
pub fn section_text(content: &str, section: &Section) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let end = section.line_end.min(lines.len());
    lines[section.line_start.min(end)..end].join(line_ending(content))
}

/// Body of a section, without its heading line, trimmed.
pub fn section_body(content: &str, section: &Section) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let end = section.line_end.min(lines.len());
    let start = (section.line_start + 1).min(end);
    lines[start..end].join("\n").trim().to_string()
}

/// Sections matching the given names, outermost only, sorted by position.
fn matching_sections(sections: &[Section], names: &[String]) -> Vec<Section> {
    let wanted: HashSet<String> = names.iter().map(|n| normalize_heading(n)).collect();
    let mut matched: Vec<Section> = sections
        .iter()
        .filter(|s| wanted.contains(&normalize_heading(&s.heading)))
        .cloned()
        .collect();
    matched.sort_by_key(|s| s.line_start);

    let mut outermost: Vec<Section> = Vec::new();
    for section in matched {
        let nested = outermost
            .last()
            .map(|outer| section.line_start < outer.line_end)
            .unwrap_or(false);
        if !nested {
            outermost.push(section);
        }
    }
    outermost
}

/// Remove the named sections. Returns the new content and the headings removed.
pub fn remove_sections(content: &str, names: &[String]) -> (String, Vec<String>) {
    let sections = parse_sections(content);
    let targets = matching_sections(&sections, names);
    let mut lines: Vec<String> = content.lines().map(String::from).collect();

    for section in targets.iter().rev() {
        lines.drain(section.line_start..section.line_end.min(lines.len()));
    }

    let removed = targets.into_iter().map(|s| s.heading).collect();
    (join_lines(&lines, content), removed)
}

/// Replace the body of each named section with a replacement line, keeping
/// the heading. Returns the new content and the headings replaced.
pub fn replace_section_bodies<F>(content: &str, names: &[String], replacement: F) -> (String, Vec<String>)
where
    F: Fn(&Section) -> String,
{
    let sections = parse_sections(content);
    let targets = matching_sections(&sections, names);
    let mut lines: Vec<String> = content.lines().map(String::from).collect();

    for section in targets.iter().rev() {
        let end = section.line_end.min(lines.len());
        let heading_line = lines[section.line_start].clone();
        let mut block = vec![heading_line, String::new(), replacement(section)];
        if end < lines.len() {
            block.push(String::new());
        }
        lines.splice(section.line_start..end, block);
    }

    let replaced = targets.into_iter().map(|s| s.heading).collect();
    (join_lines(&lines, content), replaced)
}

/// Headings of sections whose content differs between two versions,
/// including sections that were removed.
pub fn changed_sections(before: &str, after: &str) -> Vec<String> {
    let old_sections = parse_sections(before);
    let new_sections = parse_sections(after);
    let old: HashSet<(&str, &str)> = old_sections
        .iter()
        .map(|s| (s.heading.as_str(), s.content_hash.as_str()))
        .collect();
    let new_headings: HashSet<&str> = new_sections.iter().map(|s| s.heading.as_str()).collect();

    let mut changed: Vec<String> = Vec::new();
    for section in &new_sections {
        if !old.contains(&(section.heading.as_str(), section.content_hash.as_str()))
            && !changed.contains(&section.heading)
        {
            changed.push(section.heading.clone());
        }
    }
    for section in &old_sections {
        if !new_headings.contains(section.heading.as_str()) && !changed.contains(&section.heading) {
            changed.push(section.heading.clone());
        }
    }
    changed
}

fn join_lines(lines: &[String], original: &str) -> String {
    let eol = line_ending(original);
    let mut joined = lines.join(eol);
    if original.ends_with('\n') && !joined.is_empty() {
        joined.push_str(eol);
    }
    joined
}

/// Line ending used by a document: CRLF if any line uses it, otherwise LF.
fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
