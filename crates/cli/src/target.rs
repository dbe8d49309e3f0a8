//! Turning `--tool`/`--scope`/`--target` flags and settings into a target
//! directory.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    skm_config::SkmConfig,
    skm_skills::{DeployStrategy, Scope, Tool},
};

use crate::prompt;

/// Where to deploy, as given on the command line.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TargetArgs {
    /// Coding assistant to deploy for (e.g. claude, cursor) or a custom
    /// target name from the settings file.
    #[arg(long)]
    pub tool: Option<String>,
    /// Install for the user (global) or into a project.
    #[arg(long)]
    pub scope: Option<Scope>,
    /// Project directory for project scope (default: current directory).
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
    /// Explicit target directory; overrides --tool and --scope.
    #[arg(long, conflicts_with_all = ["tool", "scope", "project_dir"])]
    pub target: Option<PathBuf>,
}

pub struct Bases {
    pub home: PathBuf,
    pub cwd: PathBuf,
}

impl Bases {
    pub fn current() -> Result<Self> {
        Ok(Self {
            home: skm_config::home_dir().context("cannot determine the home directory")?,
            cwd: std::env::current_dir()?,
        })
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Resolve the target directory from flags and settings alone.
///
/// Returns `None` when nothing names a target and the caller has to ask.
pub fn resolve_from_flags(
    args: &TargetArgs,
    config: &SkmConfig,
    bases: &Bases,
) -> Result<Option<PathBuf>> {
    if let Some(target) = &args.target {
        return Ok(Some(bases.absolute(target)));
    }

    let Some(tool_name) = args.tool.as_deref().or(config.deploy.default_tool.as_deref()) else {
        return Ok(None);
    };
    if let Some(custom) = config.custom_target(tool_name) {
        return Ok(Some(bases.absolute(&custom.path)));
    }
    let tool: Tool = tool_name.parse()?;

    let scope = match (args.scope, &args.project_dir) {
        (Some(scope), _) => scope,
        (None, Some(_)) => Scope::Project,
        (None, None) => default_scope(config)?,
    };
    Ok(Some(resolve_tool(tool, scope, args.project_dir.as_deref(), bases)))
}

fn resolve_tool(tool: Tool, scope: Scope, project_dir: Option<&Path>, bases: &Bases) -> PathBuf {
    let base = match scope {
        Scope::Global => bases.home.clone(),
        Scope::Project => project_dir
            .map(|d| bases.absolute(d))
            .unwrap_or_else(|| bases.cwd.clone()),
    };
    tool.resolve(scope, &base)
}

fn default_scope(config: &SkmConfig) -> Result<Scope> {
    Ok(match config.deploy.default_scope.as_deref() {
        Some(raw) => raw.parse()?,
        None => Scope::default(),
    })
}

/// Ask for tool, scope and project directory interactively.
pub fn prompt_target(config: &SkmConfig, bases: &Bases) -> Result<PathBuf> {
    prompt::ensure_interactive("pass --tool or --target")?;

    let mut choices: Vec<String> = Tool::ALL.iter().map(|t| t.label().to_string()).collect();
    let customs: Vec<_> = config.targets.iter().collect();
    choices.extend(customs.iter().map(|(name, target)| match &target.description {
        Some(desc) => format!("{name} ({desc})"),
        None => format!("{name} ({})", target.path.display()),
    }));
    choices.push("Other (custom directory)".to_string());

    let picked = prompt::choose_one("Select target tool:", &choices, 0)?;
    if let Some(tool) = Tool::ALL.get(picked).copied() {
        let scopes = [
            "Global install (home directory)".to_string(),
            "Project directory".to_string(),
        ];
        let scope = match prompt::choose_one(
            &format!("How do you want to install for {}?", tool.label()),
            &scopes,
            0,
        )? {
            0 => Scope::Global,
            _ => Scope::Project,
        };
        let project_dir = match scope {
            Scope::Global => None,
            Scope::Project => prompt::prompt_optional(
                "Project directory (press Enter for the current directory)",
            )?
            .map(PathBuf::from),
        };
        return Ok(resolve_tool(tool, scope, project_dir.as_deref(), bases));
    }
    if let Some((_, target)) = customs.get(picked - Tool::ALL.len()) {
        return Ok(bases.absolute(&target.path));
    }

    let cwd = bases.cwd.display().to_string();
    let raw = prompt::prompt_required("Target directory", Some(&cwd))?;
    Ok(bases.absolute(Path::new(&raw)))
}

/// `--mode`, else the configured default, else copy.
pub fn resolve_mode(flag: Option<DeployStrategy>, config: &SkmConfig) -> Result<DeployStrategy> {
    if let Some(mode) = flag {
        return Ok(mode);
    }
    match config.deploy.default_mode.as_deref() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid deploy.default_mode '{raw}'")),
        None => Ok(DeployStrategy::default()),
    }
}

pub fn check_target_is_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!("target {} exists and is not a directory", path.display());
    }
    Ok(())
}
