//! Report display formatting
//!
//! Formats report listings and decrypted reports for terminal output.

use crate::models::{Report, ReportData, ReportListing};

const TITLE_MAX: usize = 48;

/// Format report listings as a table
pub fn format_report_list(listings: &[ReportListing]) -> String {
    if listings.is_empty() {
        return "No reports found.".to_string();
    }

    let title_width = listings
        .iter()
        .map(|l| truncate(l.display_title(), TITLE_MAX).chars().count())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<8}  {:<title_width$}  {:<16}  {}\n",
        "ID",
        "Title",
        "Last Modified",
        "Sync",
        title_width = title_width,
    ));
    output.push_str(&format!(
        "{:-<8}  {:-<title_width$}  {:-<16}  {:-<10}\n",
        "",
        "",
        "",
        "",
        title_width = title_width,
    ));

    for listing in listings {
        output.push_str(&format!(
            "{:<8}  {:<title_width$}  {:<16}  {}\n",
            listing.id.short(),
            truncate(listing.display_title(), TITLE_MAX),
            listing.last_modified.format("%Y-%m-%d %H:%M"),
            listing.sync_status,
            title_width = title_width,
        ));
    }

    let unreadable = listings.iter().filter(|l| !l.is_readable()).count();
    output.push('\n');
    output.push_str(&format!("{} report(s)", listings.len()));
    if unreadable > 0 {
        output.push_str(&format!(", {} could not be decrypted", unreadable));
    }
    output.push('\n');

    output
}

/// Format one decrypted report with its sync metadata
pub fn format_report_details(report: &Report, data: &ReportData) -> String {
    let mut output = String::new();

    output.push_str(&format!("Report: {}\n", data.title));
    output.push_str(&format!("{}\n", separator(40)));
    output.push_str(&format!("ID:            {}\n", data.id));
    output.push_str(&format!(
        "Created:       {}\n",
        data.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!(
        "Last modified: {}\n",
        report.last_modified.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("Sync status:   {}\n", report.sync_status));
    if let Some(synced) = report.last_sync_timestamp {
        output.push_str(&format!(
            "Last synced:   {}\n",
            synced.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    output.push_str("\nSelected listings:\n");
    if data.selected_listings.is_empty() {
        output.push_str("  (none)\n");
    }
    for listing in &data.selected_listings {
        output.push_str(&format!("  - {}\n", listing));
    }

    output.push_str("\nFunctional inputs:\n");
    if data.functional_inputs.is_empty() {
        output.push_str("  (none)\n");
    }
    for (field, value) in &data.functional_inputs {
        output.push_str(&format!("  {}: {}\n", field, value));
    }

    output.push_str("\nGenerated sections:\n");
    if data.generated_sections.is_empty() {
        output.push_str("  (none)\n");
    }
    for (question, text) in &data.generated_sections {
        output.push_str(&format!("  [{}]\n", question));
        for line in text.lines() {
            output.push_str(&format!("    {}\n", line));
        }
    }

    output
}

/// Format a separator line
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}

/// Truncate a string to a maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
