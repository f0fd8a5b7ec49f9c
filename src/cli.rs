use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "breachscout")]
#[command(about = "Discovers recent breach disclosures and enriches the affected organizations")]
#[command(version)]
pub struct Cli {
    /// Create the default configuration file at ./config/breachscout.toml
    #[arg(long)]
    pub init: bool,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Concurrent enrichment workers per stage (overrides config)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Output directory for report files (overrides config)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write a JSON report next to the CSV
    #[arg(long)]
    pub json: bool,

    /// Run the pipeline but skip publishing and the watermark update
    #[arg(long)]
    pub dry_run: bool,

    /// Publish normally but leave the watermark untouched
    #[arg(long)]
    pub no_watermark: bool,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(workers) = self.workers {
            if workers == 0 || workers > 64 {
                return Err(format!(
                    "--workers must be between 1 and 64, got {}",
                    workers
                ));
            }
        }

        if let Some(output) = &self.output {
            if output.trim().is_empty() {
                return Err("--output must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// RUST_LOG-style default directive derived from the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "breachscout=info",
            1 => "breachscout=debug",
            _ => "breachscout=trace",
        }
    }
}
