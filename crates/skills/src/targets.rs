//! Where each coding assistant looks for skills.
//!
//! Pure lookup from (tool, scope) to a path suffix; callers pick the base
//! directory (the home directory for global installs, a project directory
//! otherwise).

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Cursor,
    Windsurf,
    Antigravity,
    OpenCode,
    Claude,
    Copilot,
    Kiro,
    Codex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Under the user's home directory.
    #[default]
    Global,
    /// Under a project directory.
    Project,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Cursor,
        Tool::Windsurf,
        Tool::Antigravity,
        Tool::OpenCode,
        Tool::Claude,
        Tool::Copilot,
        Tool::Kiro,
        Tool::Codex,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Windsurf => "windsurf",
            Self::Antigravity => "antigravity",
            Self::OpenCode => "opencode",
            Self::Claude => "claude",
            Self::Copilot => "copilot",
            Self::Kiro => "kiro",
            Self::Codex => "codex",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cursor => "Cursor",
            Self::Windsurf => "Windsurf",
            Self::Antigravity => "Antigravity",
            Self::OpenCode => "Open Code",
            Self::Claude => "Claude",
            Self::Copilot => "GitHub Copilot",
            Self::Kiro => "Kiro",
            Self::Codex => "Codex",
        }
    }

    /// Skills directory relative to the scope's base directory.
    pub fn suffix(self, scope: Scope) -> &'static str {
        match (self, scope) {
            (Self::Cursor, _) => ".cursor/skills",
            (Self::Windsurf, Scope::Global) => ".codeium/windsurf/skills",
            (Self::Windsurf, Scope::Project) => ".windsurf/skills",
            (Self::Antigravity, Scope::Global) => ".gemini/antigravity/skills",
            (Self::Antigravity, Scope::Project) => ".agent/skills",
            (Self::OpenCode, Scope::Global) => ".config/opencode/skills",
            (Self::OpenCode, Scope::Project) => ".opencode/skills",
            (Self::Claude, _) => ".claude/skills",
            (Self::Copilot, Scope::Global) => ".copilot/skills",
            (Self::Copilot, Scope::Project) => ".github/skills",
            (Self::Kiro, _) => ".kiro/skills",
            (Self::Codex, _) => ".codex/skills",
        }
    }

    /// Join this tool's suffix for `scope` onto `base`.
    pub fn resolve(self, scope: Scope, base: &Path) -> PathBuf {
        self.suffix(scope)
            .split('/')
            .fold(base.to_path_buf(), |path, part| path.join(part))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match normalized.as_str() {
            "cursor" => Ok(Self::Cursor),
            "windsurf" | "codeium" => Ok(Self::Windsurf),
            "antigravity" | "gemini" => Ok(Self::Antigravity),
            "opencode" => Ok(Self::OpenCode),
            "claude" | "claudecode" => Ok(Self::Claude),
            "copilot" | "githubcopilot" => Ok(Self::Copilot),
            "kiro" => Ok(Self::Kiro),
            "codex" => Ok(Self::Codex),
            _ => Err(Error::message(format!(
                "unknown tool '{s}' (expected one of: {})",
                Tool::ALL.map(Tool::id).join(", ")
            ))),
        }
    }
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "user" => Ok(Self::Global),
            "project" | "local" => Ok(Self::Project),
            other => Err(Error::message(format!(
                "unknown scope '{other}' (expected 'global' or 'project')"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(Tool::Cursor, Scope::Global, ".cursor/skills")]
    #[case(Tool::Windsurf, Scope::Global, ".codeium/windsurf/skills")]
    #[case(Tool::Windsurf, Scope::Project, ".windsurf/skills")]
    #[case(Tool::Antigravity, Scope::Global, ".gemini/antigravity/skills")]
    #[case(Tool::Antigravity, Scope::Project, ".agent/skills")]
    #[case(Tool::OpenCode, Scope::Global, ".config/opencode/skills")]
    #[case(Tool::OpenCode, Scope::Project, ".opencode/skills")]
    #[case(Tool::Claude, Scope::Project, ".claude/skills")]
    #[case(Tool::Copilot, Scope::Global, ".copilot/skills")]
    #[case(Tool::Copilot, Scope::Project, ".github/skills")]
    #[case(Tool::Kiro, Scope::Global, ".kiro/skills")]
    #[case(Tool::Codex, Scope::Project, ".codex/skills")]
    fn suffix_table(#[case] tool: Tool, #[case] scope: Scope, #[case] expected: &str) {
        assert_eq!(tool.suffix(scope), expected);
    }

    #[test]
    fn resolve_joins_onto_base() {
        let path = Tool::OpenCode.resolve(Scope::Global, Path::new("/home/dev"));
        assert_eq!(path, PathBuf::from("/home/dev/.config/opencode/skills"));
    }

    #[rstest]
    #[case("Cursor", Tool::Cursor)]
    #[case("Open Code", Tool::OpenCode)]
    #[case("open-code", Tool::OpenCode)]
    #[case("GitHub Copilot", Tool::Copilot)]
    #[case("claude_code", Tool::Claude)]
    fn parses_labels_and_aliases(#[case] input: &str, #[case] expected: Tool) {
        assert_eq!(input.parse::<Tool>().unwrap(), expected);
    }

    #[test]
    fn every_label_round_trips() {
        for tool in Tool::ALL {
            assert_eq!(tool.label().parse::<Tool>().unwrap(), tool);
            assert_eq!(tool.id().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn unknown_tool_lists_choices() {
        let err = "vim".parse::<Tool>().unwrap_err();
        assert!(err.to_string().contains("cursor, windsurf"));
    }

    #[test]
    fn scope_parses() {
        assert_eq!("Project".parse::<Scope>().unwrap(), Scope::Project);
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert!("team".parse::<Scope>().is_err());
    }
}
