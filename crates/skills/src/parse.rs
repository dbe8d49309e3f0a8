//! Lightweight `SKILL.md` reading for display purposes.

use std::path::Path;

use serde::Deserialize;

pub const SKILL_FILE: &str = "SKILL.md";

/// Description advertised by a `SKILL.md`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkillSummary {
    #[serde(default)]
    pub description: Option<String>,
}

/// Read `<dir>/SKILL.md`, if present and readable.
pub fn read_summary(dir: &Path) -> Option<SkillSummary> {
    let skill_md = dir.join(SKILL_FILE);
    if !skill_md.is_file() {
        return None;
    }
    match std::fs::read_to_string(&skill_md) {
        Ok(content) => Some(parse_summary(&content)),
        Err(e) => {
            tracing::debug!(?skill_md, %e, "skipping unreadable SKILL.md");
            None
        },
    }
}

/// Extract a summary from `SKILL.md` content.
///
/// A `description` in the YAML frontmatter wins. Otherwise the first line
/// of body text that is not a heading is used.
pub fn parse_summary(content: &str) -> SkillSummary {
    let (mut summary, body) = match split_frontmatter(content) {
        Some((frontmatter, body)) => {
            let summary = serde_yaml::from_str::<SkillSummary>(frontmatter).unwrap_or_else(|e| {
                tracing::debug!(%e, "ignoring invalid SKILL.md frontmatter");
                SkillSummary::default()
            });
            (summary, body)
        },
        None => (SkillSummary::default(), content),
    };

    if summary.description.is_none() {
        summary.description = body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string);
    }
    summary
}

fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let after_open = content.trim_start().strip_prefix("---")?;
    let close_pos = after_open.find("\n---")?;
    let frontmatter = after_open[..close_pos].trim();
    let body = after_open[close_pos + 4..].trim_start_matches('-');
    Some((frontmatter, body))
}
