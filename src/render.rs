//! Terminal table rendering for run results.
//!
//! Thin presentation adapter over `RunResult`; no check logic lives
//! here. Column widths are computed over the text with ANSI escapes
//! stripped, so the colorized status glyphs line up.

use std::sync::OnceLock;

use regex::Regex;

use crate::report::RunResult;

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

static ANSI_RE: OnceLock<Regex> = OnceLock::new();

fn visual_width(text: &str) -> usize {
    let re = ANSI_RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(text, "").chars().count()
}

fn pad(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(visual_width(text));
    format!("{text}{}", " ".repeat(padding))
}

/// Render the outcome table.
pub fn render_table(result: &RunResult) -> String {
    let ok_glyph = format!("{GREEN}\u{221a}{RESET}");
    let fail_glyph = format!("{RED}X{RESET}");

    let header = ("check", "status", "notes");
    let rows: Vec<(String, &str, &str)> = result
        .outcomes
        .iter()
        .map(|o| {
            (
                format!("{}. {}", o.item_id, o.name),
                if o.ok { ok_glyph.as_str() } else { fail_glyph.as_str() },
                o.message.as_str(),
            )
        })
        .collect();

    let w1 = rows
        .iter()
        .map(|r| visual_width(&r.0))
        .chain([visual_width(header.0)])
        .max()
        .unwrap_or(0);
    let w2 = rows
        .iter()
        .map(|r| visual_width(r.1))
        .chain([visual_width(header.1)])
        .max()
        .unwrap_or(0);
    let w3 = rows
        .iter()
        .map(|r| visual_width(r.2))
        .chain([visual_width(header.2)])
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{}  {}  {}\n",
        pad(header.0, w1),
        pad(header.1, w2),
        pad(header.2, w3)
    ));
    out.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(w1),
        "-".repeat(w2),
        "-".repeat(w3)
    ));
    for (name, status, message) in &rows {
        out.push_str(&format!(
            "{}  {}  {}\n",
            pad(name, w1),
            pad(status, w2),
            pad(message, w3)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::catalog::Catalog;
    use crate::config::CheckConfig;
    use crate::report::{aggregate, Outcome};

    #[test]
    fn test_visual_width_ignores_ansi() {
        assert_eq!(visual_width("abc"), 3);
        assert_eq!(visual_width(&format!("{GREEN}X{RESET}")), 1);
    }

    #[test]
    fn test_table_contains_rows_in_order() {
        let catalog = Catalog::build(&CheckConfig::default());
        let outcomes = vec![
            Outcome::failed(&catalog.items()[2], "replace the disk", None),
            Outcome::passed(&catalog.items()[0], "", None),
        ];
        let table = render_table(&aggregate(outcomes, Instant::now()));

        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("check"));
        assert!(lines[2].starts_with("1. rig link"));
        assert!(lines[3].contains("replace the disk"));
    }
}
