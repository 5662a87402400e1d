//! Markdown rendering for period buckets and the consolidated archive.
//!
//! Every document starts with a `---` delimited YAML header, then a title
//! line, a one-line summary and one section per group. Rendering is pure: the
//! same groups and `generated` stamp always produce the same bytes.

use serde::Serialize;
use std::fmt::Write as _;

use crate::error::Result;
use crate::model::{Tab, TabGroup, sort_newest_first};
use crate::period::{self, GroupBy};
use crate::utils;

/// Key names are read back by `utils::parse_existing_header`; keep them stable.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportHeader<'a> {
    period: &'a str,
    group_by: GroupBy,
    total_groups: usize,
    total_tabs: usize,
    generated: &'a str,
    content_hash: &'a str,
}

/// A rendered file, ready to be written.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    /// SHA-256 of everything below the header.
    pub content_hash: String,
    pub total_groups: usize,
    pub total_tabs: usize,
}

/// Serialize `header` as a `---` delimited block followed by a blank line.
pub fn header_block<T: Serialize>(header: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(header)?;
    let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
    Ok(format!("---\n{yaml}---\n\n"))
}

/// `- [title](url)` with the link text and target escaped.
pub fn tab_link(tab: &Tab) -> String {
    format!("- [{}]({})", escape_link_text(&tab.title), escape_link_target(&tab.url))
}

fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '[' | ']' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

fn escape_link_target(url: &str) -> String {
    url.replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
}

fn group_heading(group: &TabGroup, level: usize) -> String {
    let time = group.created_at.get(11..16).unwrap_or("");
    let mut heading = format!("{} {} {}", "#".repeat(level), group.date(), time);
    if group.starred {
        heading.push_str(" ★");
    }
    if let Some(title) = &group.title {
        heading.push(' ');
        heading.push_str(title);
    }
    let noun = if group.tab_count == 1 { "tab" } else { "tabs" };
    heading.push_str(&format!(" ({} {noun})", group.tab_count));
    heading
}

fn write_groups(out: &mut String, groups: &[&TabGroup], level: usize) -> Result<()> {
    let mut sorted: Vec<TabGroup> = groups.iter().map(|g| (*g).clone()).collect();
    sort_newest_first(&mut sorted);
    for group in &sorted {
        writeln!(out)?;
        writeln!(out, "{}", group_heading(group, level))?;
        writeln!(out)?;
        for tab in &group.tabs {
            writeln!(out, "{}", tab_link(tab))?;
        }
    }
    Ok(())
}

fn summary_line(groups: usize, tabs: usize) -> String {
    format!(
        "{groups} {}, {tabs} {}",
        if groups == 1 { "group" } else { "groups" },
        if tabs == 1 { "tab" } else { "tabs" }
    )
}

fn assemble(
    period: &str,
    group_by: GroupBy,
    total_groups: usize,
    total_tabs: usize,
    generated: &str,
    body: String,
) -> Result<Document> {
    let content_hash = utils::content_hash(&body);
    let header = ExportHeader {
        period,
        group_by,
        total_groups,
        total_tabs,
        generated,
        content_hash: &content_hash,
    };
    let mut text = header_block(&header)?;
    text.push_str(&body);
    Ok(Document {
        text,
        content_hash,
        total_groups,
        total_tabs,
    })
}

/// One bucket. Groups are re-sorted newest-first whatever order they arrive in.
pub fn render_period(
    period_key: &str,
    groups: &[&TabGroup],
    group_by: GroupBy,
    generated: &str,
) -> Result<Document> {
    let total_tabs: usize = groups.iter().map(|g| g.tab_count).sum();

    let mut body = String::new();
    writeln!(body, "# OneTab: {}", period::period_label(period_key, group_by))?;
    writeln!(body)?;
    writeln!(body, "{}", summary_line(groups.len(), total_tabs))?;
    write_groups(&mut body, groups, 2)?;

    assemble(period_key, group_by, groups.len(), total_tabs, generated, body)
}

/// Everything in one document, one top-level section per month, newest first.
pub fn render_consolidated(groups: &[TabGroup], generated: &str) -> Result<Document> {
    let buckets = period::bucket(groups, GroupBy::Month);
    let total_tabs: usize = groups.iter().map(|g| g.tab_count).sum();

    let mut body = String::new();
    writeln!(body, "# OneTab: all tab groups")?;
    writeln!(body)?;
    writeln!(
        body,
        "{} across {} {}",
        summary_line(groups.len(), total_tabs),
        buckets.len(),
        if buckets.len() == 1 { "month" } else { "months" }
    )?;

    for (key, members) in buckets.iter().rev() {
        writeln!(body)?;
        writeln!(body, "## {}", period::period_label(key, GroupBy::Month))?;
        write_groups(&mut body, members, 3)?;
    }

    assemble("all", GroupBy::Month, groups.len(), total_tabs, generated, body)
}
