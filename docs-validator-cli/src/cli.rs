use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use colored::Colorize;
use docs_validator::{
    DomainPolicy, FsSourceConfig, Severity, ValidationConfig, ValidationReport, output,
    validate_fs,
};
use tracing::debug;

use crate::logging;

/// Issues at or above the `--fail-on` threshold were found.
pub const EXIT_ISSUES: u8 = 1;
/// The run could not be completed (bad root, bad pattern, worker crash, sink failure).
pub const EXIT_FATAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "validate-docs", version)]
#[command(about = "Validate front matter, quiz blocks and cross-file consistency of Markdown content")]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Content root directories (or single files) to scan
    #[arg(required = true, value_name = "ROOT")]
    roots: Vec<PathBuf>,

    /// Report format written to stdout or --output
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Lowest severity that makes the run fail
    #[arg(long, value_enum, default_value_t = FailOn::Error)]
    fail_on: FailOn,

    /// Global deadline in seconds; unfinished files make the report incomplete
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Number of parsing workers (0 = one per CPU core)
    #[arg(long, short = 'j', default_value_t = 0)]
    jobs: usize,

    /// Glob pattern of paths to skip (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Accepted host of canonical URLs (repeatable; default: any host)
    #[arg(long = "domain", value_name = "HOST")]
    domains: Vec<String>,

    /// Accepted value of the `type` field (repeatable; default: docs)
    #[arg(long = "allowed-type", value_name = "TYPE")]
    allowed_types: Vec<String>,

    /// Allow quiz questions with more than one correct option
    #[arg(long)]
    allow_multi_select: bool,

    /// Warn about fenced code blocks without a language tag
    #[arg(long)]
    require_code_language: bool,

    /// Follow symbolic links while walking the roots
    #[arg(long)]
    follow_links: bool,

    /// Maximum size of a single file in bytes
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors and skip the summary banner
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FailOn {
    Warning,
    Error,
}

impl FailOn {
    fn threshold(self) -> Severity {
        match self {
            Self::Warning => Severity::Warning,
            Self::Error => Severity::Error,
        }
    }
}

impl Cli {
    fn fs_config(&self) -> FsSourceConfig {
        let mut cfg = FsSourceConfig::default();
        cfg.paths.clone_from(&self.roots);
        cfg.exclude.clone_from(&self.exclude);
        cfg.jobs = self.jobs;
        cfg.follow_links = self.follow_links;
        cfg.timeout = self.timeout.map(Duration::from_secs);
        if let Some(max) = self.max_file_size {
            cfg.max_file_size = max;
        }
        cfg
    }

    fn validation_config(&self) -> ValidationConfig {
        let mut cfg = ValidationConfig::default();
        cfg.domain_policy = DomainPolicy::from_hosts(self.domains.clone());
        if !self.allowed_types.is_empty() {
            cfg.allowed_types.clone_from(&self.allowed_types);
        }
        cfg.allow_multi_select = self.allow_multi_select;
        cfg.require_code_language = self.require_code_language;
        cfg
    }
}

/// Parse arguments, run the validator and map the outcome to an exit code.
///
/// # Errors
///
/// Returns an error on fatal validation failures or when the report cannot
/// be written.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    if cli.no_color || !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    let fs_config = cli.fs_config();
    let validation_config = cli.validation_config();
    debug!(
        roots = fs_config.paths.len(),
        jobs = fs_config.effective_jobs(),
        "starting validation"
    );

    let report = validate_fs(&fs_config, &validation_config).await?;
    write_report(&cli, &report)?;

    let failed = report.has_issues_at(cli.fail_on.threshold());
    if cli.format == OutputFormat::Text && !cli.quiet {
        print_summary(&report, failed)?;
    }

    Ok(if failed {
        ExitCode::from(EXIT_ISSUES)
    } else {
        ExitCode::SUCCESS
    })
}

fn write_report(cli: &Cli, report: &ValidationReport) -> anyhow::Result<()> {
    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let written = match cli.format {
        OutputFormat::Json => output::write_json(report, &mut *sink),
        OutputFormat::Text => output::write_text(report, &mut *sink),
    };
    written.context("failed to write report")?;
    sink.flush().context("failed to flush report")?;
    Ok(())
}

fn print_summary(report: &ValidationReport, failed: bool) -> anyhow::Result<()> {
    let mut stderr = io::stderr().lock();
    output::write_summary(report, &mut stderr)?;
    let verdict = if failed {
        "FAILED".red().bold()
    } else {
        "PASSED".green().bold()
    };
    writeln!(
        stderr,
        "{verdict}: {} error(s), {} warning(s) in {} file(s)",
        report.errors_count(),
        report.warnings_count(),
        report.files_attempted()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["validate-docs", "content"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.fail_on, FailOn::Error);
        let fs = cli.fs_config();
        assert_eq!(fs.paths, vec![PathBuf::from("content")]);
        assert!(fs.timeout.is_none());
        assert!(!fs.follow_links);
        let validation = cli.validation_config();
        assert!(matches!(validation.domain_policy, DomainPolicy::Any));
        assert_eq!(validation.allowed_types, vec!["docs".to_owned()]);
        assert!(!validation.allow_multi_select);
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "validate-docs",
            "content",
            "--format=json",
            "--fail-on=warning",
            "--timeout=30",
            "--jobs=4",
            "--exclude=drafts/*",
            "--domain=example.com",
            "--allowed-type=docs",
            "--allowed-type=blog",
            "--allow-multi-select",
            "--max-file-size=1024",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.fail_on.threshold(), Severity::Warning);

        let fs = cli.fs_config();
        assert_eq!(fs.timeout, Some(Duration::from_secs(30)));
        assert_eq!(fs.jobs, 4);
        assert_eq!(fs.exclude, vec!["drafts/*".to_owned()]);
        assert_eq!(fs.max_file_size, 1024);

        let validation = cli.validation_config();
        assert!(matches!(
            validation.domain_policy,
            DomainPolicy::MustMatch(ref h) if h == "example.com"
        ));
        assert_eq!(validation.allowed_types, vec!["docs".to_owned(), "blog".to_owned()]);
        assert!(validation.allow_multi_select);
    }

    #[test]
    fn test_root_is_required() {
        assert!(Cli::try_parse_from(["validate-docs"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["validate-docs", "content", "-q", "-v"]).is_err());
    }
}
