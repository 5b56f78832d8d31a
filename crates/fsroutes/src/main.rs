use std::{
    fs,
    io::{self, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use fsroutes::{
    config::{Config, SyncSelector, split_names},
    orchestrator::{DependencyList, Generator},
};
use log::{LevelFilter, debug, info};

#[derive(Parser, Debug)]
#[command(name = "fsroutes", version, about = "Generate a route table module from a directory of route files")]
struct Cli {
    /// Project root; relative bases and the default config file are resolved against it
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file to use instead of `<root>/fsroutes.toml`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to search for route files (path or file: URL)
    #[arg(long)]
    base: Option<String>,

    /// Include glob, may be repeated
    #[arg(long, value_name = "GLOB")]
    pattern: Vec<String>,

    /// Exclude glob, may be repeated
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// `all`, or a comma separated list of exports bound eagerly
    #[arg(long, value_name = "all|NAMES")]
    import_sync: Option<String>,

    /// Comma separated list of exports fetched on demand
    #[arg(long, value_name = "NAMES")]
    import_async: Option<String>,

    /// Number of analysis threads
    #[arg(long)]
    workers: Option<NonZeroUsize>,

    /// Search hidden files and directories too
    #[arg(long)]
    dot: bool,

    /// Output file; the module is written to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a Make-style dependency file for the output
    #[arg(long, requires = "output")]
    depfile: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = build_config(&cli)?;
    debug!("Configuration: {config:?}");

    let mut deps = DependencyList::default();
    let output = Generator::new(config)
        .generate(&mut deps)
        .context("Failed to generate route table")?;

    match &cli.output {
        Some(path) => {
            write_if_changed(path, &output)?;
            if let Some(depfile) = &cli.depfile {
                fs::write(depfile, depfile_contents(path, &deps))
                    .with_context(|| format!("Failed to write depfile {}", depfile.display()))?;
            }
        }
        None => io::stdout()
            .lock()
            .write_all(output.as_bytes())
            .context("Failed to write to stdout")?,
    }

    Ok(())
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Config files first, then command-line overrides
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(&cli.root, cli.config.as_deref())
        .with_context(|| format!("Failed to load configuration for {}", cli.root.display()))?;

    if let Some(base) = &cli.base {
        config.base.clone_from(base);
    }
    if !cli.pattern.is_empty() {
        config.pattern.clone_from(&cli.pattern);
    }
    if !cli.ignore.is_empty() {
        config.ignore.clone_from(&cli.ignore);
    }
    if let Some(selector) = &cli.import_sync {
        config.import_sync = SyncSelector::parse(selector);
    }
    if let Some(names) = &cli.import_async {
        config.import_async = split_names(names);
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }
    if cli.dot {
        config.dot = true;
    }
    Ok(config)
}

/// Leave the file untouched when it already holds `contents`
fn write_if_changed(path: &Path, contents: &str) -> Result<()> {
    if fs::read(path).is_ok_and(|existing| existing == contents.as_bytes()) {
        info!("{} is up to date", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn depfile_contents(target: &Path, deps: &DependencyList) -> String {
    let mut contents = format!("{}:", escape_make_path(target));
    for dep in deps.iter() {
        contents.push_str(" \\\n  ");
        contents.push_str(&escape_make_path(dep));
    }
    contents.push('\n');
    contents
}

fn escape_make_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            ' ' | '#' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '$' => escaped.push_str("$$"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_depfile_lists_target_and_dependencies() {
        let deps = DependencyList {
            context_dependencies: vec![PathBuf::from("/app/src/routes")],
            file_dependencies: vec![
                PathBuf::from("/app/src/routes/a.ts"),
                PathBuf::from("/app/src/routes/my page.ts"),
            ],
        };
        assert_eq!(
            depfile_contents(Path::new("gen/routes.js"), &deps),
            "gen/routes.js: \\\n  /app/src/routes \\\n  /app/src/routes/a.ts \\\n  /app/src/routes/my\\ page.ts\n"
        );
    }

    #[test]
    fn test_command_line_overrides_config() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(
            temp.path().join("fsroutes.toml"),
            "base = \"pages\"\nimport_async = [\"default\"]\n",
        )
        .unwrap();

        let root = temp.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from([
            "fsroutes",
            "--root",
            root.as_str(),
            "--import-sync",
            "loader, action",
            "--pattern",
            "**/*.ts",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.base, "pages");
        assert_eq!(config.import_async, vec!["default"]);
        assert_eq!(config.import_sync, SyncSelector::names(["loader", "action"]));
        assert_eq!(config.pattern, vec!["**/*.ts"]);
    }

    #[test]
    fn test_unchanged_output_is_not_rewritten() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out/routes.js");

        write_if_changed(&path, "export default [];\n").unwrap();
        let first = fs::metadata(&path).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        write_if_changed(&path, "export default [];\n").unwrap();

        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), first);
        assert_eq!(fs::read_to_string(&path).unwrap(), "export default [];\n");
    }
}
