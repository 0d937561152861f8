#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use eyre::Result;

use crate::models::{Context, Message};

const SNIPPET_LEAD: usize = 10;
const SNIPPET_WIDTH: usize = 100;
const ELLIPSIS: &str = "...";
const COLUMN_GAP: &str = "  ";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Plain text table. Cells may span several lines.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths = self
            .headers
            .iter()
            .map(|h| h.chars().count())
            .collect::<Vec<_>>();

        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                let width = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                widths[i] = widths[i].max(width);
            }
        }
        widths
    }

    pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
        let widths = self.widths();

        let headers = self.headers.iter().map(|h| h.as_str()).collect::<Vec<_>>();
        write_line(out, &widths, &headers)?;
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let rule = rule.iter().map(|r| r.as_str()).collect::<Vec<_>>();
        write_line(out, &widths, &rule)?;

        for row in &self.rows {
            let cells = row
                .iter()
                .map(|c| c.lines().collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let height = cells.iter().map(|c| c.len()).max().unwrap_or(0).max(1);
            for i in 0..height {
                let line = cells
                    .iter()
                    .map(|c| c.get(i).copied().unwrap_or_default())
                    .collect::<Vec<_>>();
                write_line(out, &widths, &line)?;
            }
        }
        Ok(())
    }
}

fn write_line(out: &mut impl Write, widths: &[usize], cells: &[&str]) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

/// Keeps the first `max_lines - 1` lines and marks the cut with an ellipsis.
pub fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines = text.lines().collect::<Vec<_>>();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    format!(
        "{}{}",
        lines[..max_lines.saturating_sub(1)].join("\n"),
        ELLIPSIS
    )
}

/// The part of `content` around the first occurrence of `query`, or `None`
/// when it does not occur.
pub fn snippet(content: &str, query: &str) -> Option<String> {
    let position = content.find(query)?;
    let position = content[..position].chars().count();

    let mut snippet = if position > SNIPPET_LEAD {
        format!(
            "{}{}",
            ELLIPSIS,
            content.chars().skip(position - SNIPPET_LEAD).collect::<String>()
        )
    } else {
        content.to_string()
    };

    if snippet.chars().count() > SNIPPET_WIDTH {
        snippet = format!(
            "{}{}",
            snippet.chars().take(SNIPPET_WIDTH).collect::<String>(),
            ELLIPSIS
        );
    }
    Some(snippet)
}

/// `role: content` lines for the non-empty messages.
pub fn summary(messages: &[Message], max_lines: usize) -> String {
    let text = messages
        .iter()
        .filter(|m| !m.content().is_empty())
        .map(|m| format!("{}: {}", m.role(), m.content()))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_lines(&text, max_lines)
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

pub fn write_history(
    out: &mut impl Write,
    context: &Context,
    messages: &[Message],
) -> Result<()> {
    writeln!(out, "[{}: {}]", context.id(), context.title())?;
    writeln!(out)?;
    for message in messages.iter().filter(|m| !m.content().is_empty()) {
        writeln!(out, "{}:", message.role())?;
        for line in message.content().lines() {
            if line.is_empty() {
                writeln!(out)?;
            } else {
                writeln!(out, "    {}", line)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
