use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use addonvet::config::Config;
use addonvet::output::OutputFormat;
use addonvet::report::Severity;
use addonvet::rules;
use addonvet::{ModeFlags, ScanOptions};

#[derive(Parser)]
#[command(
    name = "addonvet",
    about = "Static analyzer for browser-extension JavaScript",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an extension directory (or a single script) for hazardous patterns
    Scan {
        /// Path to the extension directory or script file
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum severity to fail (info, notice, warning, error)
        #[arg(long)]
        fail_on: Option<String>,

        /// Analyze as a restartless/bootstrapped add-on
        #[arg(long)]
        bootstrapped: bool,

        /// Application versions the add-on targets (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List all registered detection rules
    ListRules,

    /// Generate a starter .addonvet.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            path,
            config,
            format,
            fail_on,
            bootstrapped,
            targets,
            output,
        } => cmd_scan(path, config, format, fail_on, bootstrapped, targets, output),
        Commands::ListRules => cmd_list_rules(),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_scan(
    path: PathBuf,
    config: Option<PathBuf>,
    format_str: String,
    fail_on_str: Option<String>,
    bootstrapped: bool,
    targets: Vec<String>,
    output_path: Option<PathBuf>,
) -> Result<i32, addonvet::error::VetError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let fail_on = fail_on_str.and_then(|s| {
        let sev = Severity::from_str_lenient(&s);
        if sev.is_none() {
            eprintln!("Warning: unknown severity '{}', using config default", s);
        }
        sev
    });

    let options = ScanOptions {
        config_path: config,
        format,
        fail_on_override: fail_on,
        flags: ModeFlags {
            bootstrapped,
            supported_targets: targets.into_iter().collect(),
        },
    };

    let report = addonvet::scan(&path, &options)?;
    let rendered = addonvet::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(if report.verdict.pass { 0 } else { 1 })
}

fn cmd_list_rules() -> Result<i32, addonvet::error::VetError> {
    println!("{:<45} {:<8} SUMMARY", "ID", "SEVERITY");
    for rule in rules::all_rules() {
        println!("{:<45} {:<8} {}", rule.id.to_string(), rule.severity, rule.summary);
    }
    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, addonvet::error::VetError> {
    let path = PathBuf::from(".addonvet.toml");
    if path.exists() && !force {
        eprintln!(".addonvet.toml already exists (use --force to overwrite)");
        return Ok(1);
    }
    std::fs::write(&path, Config::starter_toml())?;
    println!("Wrote {}", path.display());
    Ok(0)
}
