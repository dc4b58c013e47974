use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use podfilter::cli::{explain, with_rules};
use podfilter::{ControlRange, Decision, FilterOptions, PatternCache, RecordFilter, RuleTable};

/// podfilter - try out Kubernetes log filter rules outside of fluent-bit
#[derive(Parser, Debug)]
#[command(name = "podfilter")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter newline-delimited JSON records and print the kept ones
    Run {
        /// Rule table applied to records that carry none of their own
        #[arg(short, long, env = "CONFIG_PATH")]
        rules: Option<PathBuf>,

        /// Control bytes escaped in the log field of kept records
        #[arg(long, value_enum, default_value_t = RangeArg::Full)]
        control_range: RangeArg,

        /// Input file (reads stdin when omitted)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
    },
    /// Show which rule applies to a container, namespace and pod
    Explain {
        /// Rule table file
        #[arg(short, long, env = "CONFIG_PATH")]
        rules: PathBuf,

        #[arg(long)]
        container: String,

        #[arg(long)]
        namespace: String,

        /// Pod name as reported by Kubernetes
        #[arg(long)]
        pod: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RangeArg {
    /// 0x00-0x1F and 0x7F
    Full,
    /// 0x00-0x08 and 0x7F
    LowOnly,
}

impl From<RangeArg> for ControlRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::Full => ControlRange::Full,
            RangeArg::LowOnly => ControlRange::LowOnly,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Command::Run {
            rules,
            control_range,
            input,
        } => run(rules.as_deref(), control_range.into(), input.as_deref()),
        Command::Explain {
            rules,
            container,
            namespace,
            pod,
        } => read_rules(&rules).map(|(_, table)| {
            println!("{}", explain(&table, &container, &namespace, &pod));
        }),
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn read_rules(path: &Path) -> Result<(String, RuleTable)> {
    let config = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules from {}", path.display()))?;
    let table = RuleTable::parse(&config)
        .with_context(|| format!("Invalid rule table in {}", path.display()))?;
    Ok((config, table))
}

fn run(rules: Option<&Path>, control_range: ControlRange, input: Option<&Path>) -> Result<()> {
    let rules = rules.map(read_rules).transpose()?.map(|(config, _)| config);

    let filter = RecordFilter::new(FilterOptions::default().with_control_range(control_range))
        .with_cache(PatternCache::default());

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let (mut kept, mut skipped) = (0u64, 0u64);
    for line in reader.lines() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let raw = match &rules {
            Some(config) => with_rules(line, &filter.options().config_key, config),
            None => line.into_bytes(),
        };

        match filter.filter(&raw) {
            Decision::Keep(record) => {
                out.write_all(&record)?;
                out.write_all(b"\n")?;
                kept += 1;
            }
            Decision::Skip => skipped += 1,
        }
    }
    out.flush()?;

    tracing::info!(kept, skipped, "finished filtering");
    Ok(())
}
