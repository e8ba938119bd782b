//! S3 Exchange Stack synthesizer
//!
//! Renders the storage and identity stacks into a cloud assembly directory

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use s3_exchange_stack::{AppBuilder, Assembly, Partition, DEFAULT_TAGS_FILE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "s3-exchange-synth")]
#[command(about = "Synthesize the partner exchange buckets and IAM users to CloudFormation")]
struct Args {
    /// Tag document (YAML, TOML or JSON)
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_TAGS_FILE)]
    config: PathBuf,

    /// Target account
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,

    /// Target region
    #[arg(long, global = true, env = "CDK_DEFAULT_REGION")]
    region: Option<String>,

    /// ARN partition (aws, aws-cn, aws-us-gov) [default: from region, else aws-cn]
    #[arg(long, global = true, value_parser = parse_partition)]
    partition: Option<Partition>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write every template and manifest.json
    Synth {
        /// Output directory
        #[arg(short = 'o', long, default_value = "cdk.out")]
        output: PathBuf,
    },

    /// Print one stack template to stdout
    Template {
        /// Resource group: storage or identity
        group: String,
    },

    /// Print the effective partner permissions on each exchange bucket
    Access,
}

/// Parse partition from CLI string
fn parse_partition(s: &str) -> Result<Partition, String> {
    s.parse()
}

fn stack_for_group<'a>(assembly: &'a Assembly, group: &str) -> anyhow::Result<&'a str> {
    let name = match group.to_lowercase().as_str() {
        "storage" | "s3" => assembly.storage().name(),
        "identity" | "iam" => assembly.identity().name(),
        _ => bail!(
            "Invalid resource group '{}'. Valid options: storage, identity",
            group
        ),
    };
    Ok(name)
}

/// `RUST_LOG` when set, otherwise `info`
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so templates on stdout stay clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter())
        .init();

    let args = Args::parse();

    let mut builder = AppBuilder::new().config_path(&args.config);
    if let Some(account) = args.account {
        builder = builder.account(account);
    }
    if let Some(region) = args.region {
        builder = builder.region(region);
    }
    if let Some(partition) = args.partition {
        builder = builder.partition(partition);
    }

    let app = builder
        .build()
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    let assembly = app.build().context("Failed to build deployment")?;

    match args.command {
        Command::Synth { output } => {
            let cloud = assembly.synth().context("Synthesis failed")?;
            let written = cloud
                .write_to(&output)
                .with_context(|| format!("Failed to write assembly to {:?}", output))?;
            info!("Synthesized {} files into {:?}", written.len(), output);
        }
        Command::Template { group } => {
            let stack = stack_for_group(&assembly, &group)?;
            let cloud = assembly.synth().context("Synthesis failed")?;
            let template = cloud
                .template(stack)
                .with_context(|| format!("No template for stack {}", stack))?;
            println!("{}", serde_json::to_string_pretty(template)?);
        }
        Command::Access => {
            print!("{}", assembly.access_report());
        }
    }

    Ok(())
}
