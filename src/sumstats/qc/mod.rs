//! Implementation of `sumstats qc` subcommand.
//!
//! Filters summary statistics by effective minor allele count and HWE
//! p-value.  Kept records are written unchanged, rejected ones are dropped.

pub mod filter;
pub mod resolve;

use std::io::{BufRead, Write};

use rayon::prelude::*;
use thousands::Separable;

use crate::{
    common::{self, io::open_read_maybe_gz, io::open_write_maybe_gz},
    err::{ArgError, InputError},
    sumstats::record::{ColumnIndex, ColumnNames, VariantRecord},
};

use self::filter::{decide, FilterVerdict, RunCounters};

/// Number of leading records to trace at debug level.
const TRACE_FIRST_RECORDS: usize = 5;

/// Thresholds and switches for the QC filter.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct QcParams {
    /// Minimal EMAC to keep a variant.
    pub emac_min: f64,
    /// Minimal HWE p-value to keep a variant.
    pub hwe_minp: f64,
    /// Prefer the controls stratum for the exact HWE test.
    pub use_controls: bool,
    /// Accept `MAC` from the annotation as EMAC.
    pub use_mac_from_info: bool,
}

impl Default for QcParams {
    fn default() -> Self {
        Self {
            emac_min: 100.0,
            hwe_minp: 1e-12,
            use_controls: false,
            use_mac_from_info: false,
        }
    }
}

impl QcParams {
    pub fn validate(&self) -> Result<(), ArgError> {
        if !self.emac_min.is_finite() || self.emac_min < 0.0 {
            return Err(ArgError::InvalidEmacMin(self.emac_min));
        }
        if !(0.0..=1.0).contains(&self.hwe_minp) {
            return Err(ArgError::InvalidHweMinP(self.hwe_minp));
        }
        Ok(())
    }
}

/// Command line arguments for `sumstats qc` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "filter summary statistics by EMAC and HWE", long_about = None)]
pub struct Args {
    /// Path to input TSV file (`.gz` supported), `-` for stdin.
    #[arg(long, default_value = "-")]
    pub path_in: String,
    /// Path to output TSV file (`.gz` supported), `-` for stdout.
    #[arg(long, default_value = "-")]
    pub path_out: String,
    /// Minimal EMAC.
    #[arg(long, default_value_t = 100.0)]
    pub emac_min: f64,
    /// Minimal HWE p-value.
    #[arg(long, default_value_t = 1e-12)]
    pub hwe_minp: f64,
    /// Run the exact HWE test on control genotype counts where available.
    #[arg(long)]
    pub use_controls: bool,
    /// Use `MAC` from the INFO column when `EMAC` is missing.
    #[arg(long)]
    pub use_mac_from_info: bool,
    /// Set the number of threads to use, defaults to number of cores.
    #[arg(long)]
    pub num_threads: Option<usize>,
    /// Number of records processed per parallel batch.
    #[arg(long, default_value_t = 10_000)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub columns: ColumnNames,
}

impl From<&Args> for QcParams {
    fn from(args: &Args) -> Self {
        Self {
            emac_min: args.emac_min,
            hwe_minp: args.hwe_minp,
            use_controls: args.use_controls,
            use_mac_from_info: args.use_mac_from_info,
        }
    }
}

/// Filter all records from `reader` into `writer`.
///
/// Records are resolved in parallel one chunk at a time; output order equals
/// input order.
fn run_filtration(
    reader: &mut csv::Reader<Box<dyn BufRead>>,
    writer: &mut csv::Writer<Box<dyn Write>>,
    column_index: &ColumnIndex,
    params: &QcParams,
    chunk_size: usize,
) -> Result<RunCounters, anyhow::Error> {
    let start = std::time::Instant::now();
    let mut prev = std::time::Instant::now();
    let mut counters = RunCounters::default();
    let mut records = reader.records();
    let mut chunk = Vec::with_capacity(chunk_size);

    loop {
        chunk.clear();
        for fields in records.by_ref().take(chunk_size) {
            chunk.push(fields.map_err(|e| anyhow::anyhow!("problem reading record: {}", e))?);
        }
        if chunk.is_empty() {
            break; // all done
        }

        let verdicts = chunk
            .par_iter()
            .map(|fields| decide(&VariantRecord::from_fields(fields, column_index), params))
            .collect::<Vec<_>>();

        for (i, (fields, verdict)) in chunk.iter().zip(verdicts.iter()).enumerate() {
            if counters.total + i < TRACE_FIRST_RECORDS {
                trace_verdict(fields, column_index, verdict);
            }
            if verdict.keep {
                writer
                    .write_record(fields)
                    .map_err(|e| anyhow::anyhow!("failed to write record: {}", e))?;
            }
        }

        let chunk_counters = verdicts.iter().fold(RunCounters::default(), RunCounters::record);
        counters = counters.merge(chunk_counters);

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at record {}", counters.total.separate_with_commas());
            prev = std::time::Instant::now();
        }
    }

    tracing::info!(
        "... filtered {} records in {:?}",
        counters.total.separate_with_commas(),
        start.elapsed()
    );

    Ok(counters)
}

fn trace_verdict(fields: &csv::StringRecord, column_index: &ColumnIndex, verdict: &FilterVerdict) {
    tracing::debug!(
        "{}: EMAC={:?} ({}) HWE={:?} ({}) keep={}",
        column_index.id.and_then(|i| fields.get(i)).unwrap_or("."),
        verdict.emac.value,
        verdict
            .emac
            .source
            .map_or_else(|| "none".to_string(), |rule| rule.to_string()),
        verdict.hwe.value,
        verdict
            .hwe
            .source
            .map_or_else(|| "none".to_string(), |rule| rule.to_string()),
        verdict.keep
    );
}

/// Main entry point for `sumstats qc` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<RunCounters, anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let params = QcParams::from(args);
    params.validate()?;
    args.columns.validate()?;
    if args.chunk_size == 0 {
        return Err(ArgError::InvalidChunkSize.into());
    }
    tracing::info!("params = {}", serde_json::to_string(&params)?);

    super::init_thread_pool(args.num_threads)?;

    tracing::info!("opening input file...");
    let mut reader = common::io::tsv_reader(
        open_read_maybe_gz(&args.path_in)
            .map_err(|e| anyhow::anyhow!("could not open input file {}: {}", &args.path_in, e))?,
    );
    let header = reader
        .headers()
        .map_err(|e| anyhow::anyhow!("problem reading header: {}", e))?
        .clone();
    if header.is_empty() {
        return Err(InputError::Empty.into());
    }
    let column_index = ColumnIndex::from_header(&header, &args.columns);

    tracing::info!("opening output file...");
    let mut writer = common::io::tsv_writer(
        open_write_maybe_gz(&args.path_out)
            .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?,
    );
    writer
        .write_record(&header)
        .map_err(|e| anyhow::anyhow!("could not write header: {}", e))?;

    common::trace_rss_now();

    tracing::info!("starting filtration...");
    let counters = run_filtration(
        &mut reader,
        &mut writer,
        &column_index,
        &params,
        args.chunk_size,
    )?;
    writer.flush()?;
    tracing::info!("... done with filtration");

    tracing::info!(
        "summary: kept {} of {} records (rejected by EMAC: {}, rejected by HWE: {})",
        counters.kept.separate_with_commas(),
        counters.total.separate_with_commas(),
        counters.rejected_emac.separate_with_commas(),
        counters.rejected_hwe.separate_with_commas()
    );

    common::trace_rss_now();

    tracing::info!(
        "All of `sumstats qc` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(counters)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{filter::RunCounters, Args, QcParams};
    use crate::{err::ArgError, sumstats::record::ColumnNames};

    fn args(path_in: &str, path_out: &str) -> Args {
        Args {
            path_in: path_in.into(),
            path_out: path_out.into(),
            emac_min: 100.0,
            hwe_minp: 1e-12,
            use_controls: false,
            use_mac_from_info: false,
            num_threads: None,
            chunk_size: 3,
            columns: ColumnNames::default(),
        }
    }

    fn ids(path: &std::path::Path) -> Result<Vec<String>, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .skip(1)
            .map(|line| line.split('\t').nth(2).unwrap_or_default().to_string())
            .collect())
    }

    #[test]
    fn params_default() {
        assert_eq!(
            QcParams::default(),
            serde_json::from_str(
                r#"{"emac_min": 100.0, "hwe_minp": 1e-12, "use_controls": false, "use_mac_from_info": false}"#
            )
            .unwrap()
        );
        assert!(QcParams::default().validate().is_ok());
    }

    #[rstest::rstest]
    #[case(-1.0, 1e-12, Some(ArgError::InvalidEmacMin(-1.0)))]
    #[case(f64::INFINITY, 1e-12, Some(ArgError::InvalidEmacMin(f64::INFINITY)))]
    #[case(100.0, 1.5, Some(ArgError::InvalidHweMinP(1.5)))]
    #[case(0.0, 0.0, None)]
    #[case(100.0, 1.0, None)]
    fn params_validate(
        #[case] emac_min: f64,
        #[case] hwe_minp: f64,
        #[case] expected: Option<ArgError>,
    ) {
        let params = QcParams {
            emac_min,
            hwe_minp,
            ..Default::default()
        };

        assert_eq!(params.validate().err(), expected);
    }

    #[test]
    fn run_filters_records() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_out = tmpdir.join("out.tsv");

        let counters = super::run(
            &crate::common::Args::default(),
            &args("tests/data/sumstats/regenie.tsv", path_out.to_str().unwrap()),
        )?;

        assert_eq!(
            counters,
            RunCounters {
                total: 8,
                rejected_emac: 2,
                rejected_hwe: 2,
                kept: 4,
            }
        );
        assert_eq!(ids(&path_out)?, vec!["rs1", "rs4", "rs7", "rs8"]);

        // Kept lines and the header are passed through unchanged.
        let input = std::fs::read_to_string("tests/data/sumstats/regenie.tsv")?;
        let output = std::fs::read_to_string(&path_out)?;
        for line in output.lines() {
            assert!(input.lines().any(|l| l == line), "not in input: {}", line);
        }
        assert_eq!(output.lines().next(), input.lines().next());

        Ok(())
    }

    #[test]
    fn run_keeps_crlf_line_endings() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_in = tmpdir.join("crlf.tsv");
        let path_out = tmpdir.join("out.tsv");
        let input =
            std::fs::read_to_string("tests/data/sumstats/regenie.tsv")?.replace('\n', "\r\n");
        std::fs::write(&path_in, &input)?;

        let counters = super::run(
            &crate::common::Args::default(),
            &args(path_in.to_str().unwrap(), path_out.to_str().unwrap()),
        )?;

        assert_eq!(counters.kept, 4);
        let output = std::fs::read_to_string(&path_out)?;
        assert!(output.ends_with("\r\n"));
        for line in output.split_inclusive('\n') {
            assert!(
                input.split_inclusive('\n').any(|l| l == line),
                "not in input: {:?}",
                line
            );
        }

        Ok(())
    }

    #[test]
    fn run_is_idempotent() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_first = tmpdir.join("first.tsv.gz");
        let path_second = tmpdir.join("second.tsv");

        let first = super::run(
            &crate::common::Args::default(),
            &args("tests/data/sumstats/regenie.tsv", path_first.to_str().unwrap()),
        )?;
        let second = super::run(
            &crate::common::Args::default(),
            &args(path_first.to_str().unwrap(), path_second.to_str().unwrap()),
        )?;

        assert_eq!(second.total, first.kept);
        assert_eq!(second.kept, first.kept);
        assert_eq!(ids(&path_second)?, vec!["rs1", "rs4", "rs7", "rs8"]);

        Ok(())
    }

    #[test]
    fn run_lower_threshold_keeps_more() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_out = tmpdir.join("out.tsv");

        let counters = super::run(
            &crate::common::Args::default(),
            &Args {
                emac_min: 10.0,
                chunk_size: 1,
                ..args("tests/data/sumstats/regenie.tsv", path_out.to_str().unwrap())
            },
        )?;

        assert_eq!(counters.kept, 5);
        assert_eq!(ids(&path_out)?, vec!["rs1", "rs2", "rs4", "rs7", "rs8"]);

        Ok(())
    }

    #[test]
    fn run_rejects_empty_input() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_in = tmpdir.join("empty.tsv");
        std::fs::write(&path_in, "")?;

        let result = super::run(
            &crate::common::Args::default(),
            &args(
                path_in.to_str().unwrap(),
                tmpdir.join("out.tsv").to_str().unwrap(),
            ),
        );

        assert!(result.is_err());

        Ok(())
    }

    #[test]
    fn run_rejects_zero_chunk_size() {
        let result = super::run(
            &crate::common::Args::default(),
            &Args {
                chunk_size: 0,
                ..args("tests/data/sumstats/regenie.tsv", "-")
            },
        );

        assert!(result.is_err());
    }
}
