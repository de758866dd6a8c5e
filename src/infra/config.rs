use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::ingest::{MAX_FILE_SIZE_BYTES, TAIL_LINES};

/// Config file names probed in the scan root, first hit wins
pub const CONFIG_FILES: [&str; 4] = ["deepctx.toml", ".deepctx.toml", "deepctx.yaml", "deepctx.json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Extra ignore patterns, evaluated after the built-ins and
    /// before the project ignore file
    pub ignore_patterns: Vec<String>,

    /// Project ignore file name, relative to the scan root
    pub ignore_file: String,

    /// Default report path
    pub output_file: String,

    /// Files above this many bytes are tail-truncated
    pub max_file_size: u64,

    /// Lines kept from a truncated file
    pub tail_lines: usize,

    /// Ingest worker count (default: available parallelism)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: Vec::new(),
            ignore_file: ".gitignore".to_string(),
            output_file: "codebase_context.md".to_string(),
            max_file_size: MAX_FILE_SIZE_BYTES,
            tail_lines: TAIL_LINES,
            workers: None,
        }
    }
}

/// Load config from `dir` (if a config file exists there), overlaid
/// with `DEEPCTX_*` environment variables. Missing keys take defaults.
pub fn load_config(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in CONFIG_FILES
    {
        let path = dir.join(name);

        if path.is_file()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // DEEPCTX_MAX_FILE_SIZE=..., DEEPCTX_IGNORE_PATTERNS="a,b"
    builder = builder.add_source(
        config::Environment::with_prefix("DEEPCTX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("ignore_patterns"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string =
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: Would write {}:\n{toml_string}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_without_file() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let cfg = load_config(tmp.path())?;

        assert_eq!(cfg.ignore_file, ".gitignore");
        assert_eq!(cfg.output_file, "codebase_context.md");
        assert_eq!(cfg.max_file_size, 1_000_000);
        assert_eq!(cfg.tail_lines, 1_000);
        Ok(())
    }

    #[test]
    fn partial_file_overrides_some_keys() -> Result<()>
    {
        let tmp = TempDir::new()?;
        std::fs::write(
            tmp.path()
                .join("deepctx.toml"),
            "ignore_patterns = [\"*.snap\"]\nworkers = 2\n",
        )?;

        let cfg = load_config(tmp.path())?;

        assert_eq!(cfg.ignore_patterns, vec!["*.snap".to_string()]);
        assert_eq!(cfg.workers, Some(2));
        assert_eq!(cfg.tail_lines, 1_000);
        Ok(())
    }

    #[test]
    fn init_writes_loadable_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let ctx = AppContext {
            quiet: true,
            no_color: true,
            dry_run: false,
            verbose: false,
        };

        init(
            InitArgs {
                path: tmp
                    .path()
                    .to_path_buf(),
                force: false,
            },
            &ctx,
        )?;

        assert_eq!(load_config(tmp.path())?, Config::default());

        // Second run refuses without --force
        let again = init(
            InitArgs {
                path: tmp
                    .path()
                    .to_path_buf(),
                force: false,
            },
            &ctx,
        );
        assert!(again.is_err());
        Ok(())
    }
}
