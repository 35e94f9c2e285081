//! GWAS summary statistics QC main executable

pub mod common;
pub mod err;
pub mod sumstats;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "GWAS summary statistics QC",
    long_about = "Filters GWAS summary statistics by EMAC and HWE and prepares them for LDSC"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Summary statistics related commands.
    Sumstats(Sumstats),
}

/// Parsing of "sumstats *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Sumstats {
    /// The sub command to run
    #[command(subcommand)]
    command: SumstatsCommands,
}

/// Enum supporting the parsing of "sumstats *" sub commands.
#[derive(Debug, Subcommand)]
enum SumstatsCommands {
    Qc(sumstats::qc::Args),
    Munge(sumstats::munge::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Sumstats(sumstats) => match &sumstats.command {
                SumstatsCommands::Qc(args) => {
                    sumstats::qc::run(&cli.common, args)?;
                }
                SumstatsCommands::Munge(args) => {
                    sumstats::munge::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, SumstatsCommands};

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_qc() {
        let cli = Cli::parse_from([
            "gwas-sumstats-qc",
            "sumstats",
            "qc",
            "--path-in",
            "in.tsv.gz",
            "--emac-min",
            "50",
            "--use-controls",
            "--geno-cols-controls",
            "CTRL_RR,CTRL_RA,CTRL_AA",
        ]);

        let Commands::Sumstats(sumstats) = cli.command;
        match sumstats.command {
            SumstatsCommands::Qc(args) => {
                assert_eq!(args.path_in, "in.tsv.gz");
                assert_eq!(args.path_out, "-");
                assert_eq!(args.emac_min, 50.0);
                assert_eq!(args.hwe_minp, 1e-12);
                assert!(args.use_controls);
                assert!(!args.use_mac_from_info);
                assert_eq!(args.columns.id_col, "ID");
                assert_eq!(
                    args.columns.geno_cols_controls,
                    vec!["CTRL_RR", "CTRL_RA", "CTRL_AA"]
                );
                assert!(args.columns.geno_cols_cases.is_empty());
            }
            SumstatsCommands::Munge(_) => panic!("expected qc"),
        }
    }

    #[test]
    fn parse_munge() {
        let cli = Cli::parse_from([
            "gwas-sumstats-qc",
            "-v",
            "sumstats",
            "munge",
            "--logistic",
            "--effect-col",
            "OR",
        ]);

        let Commands::Sumstats(sumstats) = cli.command;
        match sumstats.command {
            SumstatsCommands::Munge(args) => {
                assert!(args.logistic);
                assert_eq!(args.columns.effect_col, "OR");
                assert_eq!(args.chunk_size, 10_000);
            }
            SumstatsCommands::Qc(_) => panic!("expected munge"),
        }
    }
}
