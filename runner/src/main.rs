//! Launch an external executable repeatedly and report each run.
//!
//! With no flags this starts the default executable 100 times, one after the
//! other, printing `Run i/N` and `Exit code: c` for every run.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use repeat_runner::exit_codes;
use repeat_runner::io::config::{
    CaptureMode, ConfigOverrides, DEFAULT_CONFIG_FILE, RunConfig, apply_overrides, load_config,
    write_config,
};
use repeat_runner::io::launcher::ProcessLauncher;
use repeat_runner::io::process::LaunchError;
use repeat_runner::logging;
use repeat_runner::looping::run_loop;

#[derive(Parser)]
#[command(
    name = "repeat-runner",
    version,
    about = "Launch an executable repeatedly and report each exit code",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `repeat-runner.toml`.
    Init {
        /// Where to write the config file.
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML config file (default: `./repeat-runner.toml` if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Executable to launch.
    #[arg(long)]
    exe: Option<PathBuf>,

    /// Number of runs.
    #[arg(short = 'n', long)]
    runs: Option<u32>,

    /// Whether child stdout/stderr are inherited or captured and reported.
    #[arg(long, value_enum)]
    capture: Option<CaptureMode>,

    /// Kill a run that takes longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            exe_path: self.exe.clone(),
            num_runs: self.runs,
            capture: self.capture,
            timeout_secs: self.timeout_secs,
        }
    }
}

fn main() {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // `--help` and `--version` exit through clap as usual.
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit_codes::INVALID);
        }
    };
    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        let code = if err.downcast_ref::<LaunchError>().is_some() {
            exit_codes::LAUNCH_FAILED
        } else {
            exit_codes::INVALID
        };
        std::process::exit(code);
    }
    std::process::exit(exit_codes::OK);
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Init { path, force }) => cmd_init(&path, force),
        None => cmd_run(&cli.run),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_config(path, &RunConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_run(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = run_loop(&config, &ProcessLauncher, &mut out)?;
    out.flush().context("flush stdout")?;

    info!(
        runs = outcome.runs_completed,
        nonzero_exits = outcome.nonzero_exits,
        timed_out = outcome.timed_out,
        "run loop finished"
    );
    Ok(())
}

/// Defaults < config file < command-line flags.
fn resolve_config(args: &RunArgs) -> Result<RunConfig> {
    let base = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            load_config(path)?
        }
        None => load_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    apply_overrides(base, &args.overrides()).context("invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_no_args_runs_with_defaults() {
        let cli = Cli::parse_from(["repeat-runner"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.overrides(), ConfigOverrides::default());
    }

    #[test]
    fn parse_run_flags() {
        let cli = Cli::parse_from([
            "repeat-runner",
            "--exe",
            "/bin/true",
            "-n",
            "3",
            "--capture",
            "capture",
            "--timeout-secs",
            "10",
        ]);
        let overrides = cli.run.overrides();
        assert_eq!(overrides.exe_path, Some(PathBuf::from("/bin/true")));
        assert_eq!(overrides.num_runs, Some(3));
        assert_eq!(overrides.capture, Some(CaptureMode::Capture));
        assert_eq!(overrides.timeout_secs, Some(10));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["repeat-runner", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Command::Init { force: true, .. })
        ));
    }

    #[test]
    fn malformed_flag_is_a_parse_error() {
        let err = Cli::try_parse_from(["repeat-runner", "--runs", "abc"])
            .err()
            .expect("non-numeric run count must fail");
        assert!(err.use_stderr());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let args = RunArgs {
            config: Some(PathBuf::from("/no/such/repeat-runner.toml")),
            ..RunArgs::default()
        };
        let err = resolve_config(&args).expect_err("missing config must fail");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn flags_override_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "num_runs = 7\nexe_path = \"/opt/x\"\n").expect("write");
        let args = RunArgs {
            config: Some(path),
            runs: Some(2),
            ..RunArgs::default()
        };
        let cfg = resolve_config(&args).expect("resolve");
        assert_eq!(cfg.num_runs, 2);
        assert_eq!(cfg.exe_path, PathBuf::from("/opt/x"));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        cmd_init(&path, false).expect("first init");
        assert!(cmd_init(&path, false).is_err());
        cmd_init(&path, true).expect("forced init");
        assert_eq!(load_config(&path).expect("load"), RunConfig::default());
    }
}
