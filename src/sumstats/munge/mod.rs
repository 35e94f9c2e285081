//! Implementation of `sumstats munge` subcommand.
//!
//! Converts summary statistics into the eight-column `SNP A1 A2 N Z P BETA SE`
//! table expected by LD score regression tooling.  Missing values are written
//! as empty fields.

pub mod harmonize;

use std::io::{BufRead, Write};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::{
    common::{self, io::open_read_maybe_gz, io::open_write_maybe_gz},
    err::{ArgError, InputError},
    sumstats::record::{ColumnIndex, ColumnNames, VariantRecord},
};

use self::harmonize::{harmonize, HarmonizedEffect};

/// Number of leading records to trace at debug level.
const TRACE_FIRST_RECORDS: usize = 5;

/// Header of the output table.
pub const OUTPUT_HEADER: [&str; 8] = ["SNP", "A1", "A2", "N", "Z", "P", "BETA", "SE"];

/// Switches for effect harmonization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MungeParams {
    /// The association model was logistic, so the effect column is not a
    /// linear beta.
    pub logistic: bool,
}

/// Command line arguments for `sumstats munge` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "prepare summary statistics for LDSC", long_about = None)]
pub struct Args {
    /// Path to input TSV file (`.gz` supported), `-` for stdin.
    #[arg(long, default_value = "-")]
    pub path_in: String,
    /// Path to output TSV file (`.gz` supported), `-` for stdout.
    #[arg(long, default_value = "-")]
    pub path_out: String,
    /// The model was logistic (effect column is usually an OR).
    #[arg(long)]
    pub logistic: bool,
    /// Set the number of threads to use, defaults to number of cores.
    #[arg(long)]
    pub num_threads: Option<usize>,
    /// Number of records processed per parallel batch.
    #[arg(long, default_value_t = 10_000)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub columns: ColumnNames,
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub snp: Option<String>,
    pub a1: Option<String>,
    pub a2: Option<String>,
    pub n: Option<f64>,
    pub z: Option<f64>,
    pub p: Option<f64>,
    pub beta: Option<f64>,
    pub se: Option<f64>,
}

impl Record {
    pub fn new(record: VariantRecord, effect: &HarmonizedEffect) -> Self {
        Self {
            snp: record.id,
            a1: record.effect_allele,
            a2: record.other_allele,
            n: record.sample_size,
            z: effect.z,
            p: record.p_value,
            beta: effect.beta,
            se: effect.se,
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MungeCounters {
    pub total: usize,
    pub with_beta: usize,
    pub with_se: usize,
    pub with_z: usize,
}

impl MungeCounters {
    pub fn record(mut self, record: &Record) -> Self {
        self.total += 1;
        self.with_beta += usize::from(record.beta.is_some());
        self.with_se += usize::from(record.se.is_some());
        self.with_z += usize::from(record.z.is_some());
        self
    }

    pub fn merge(self, other: MungeCounters) -> Self {
        Self {
            total: self.total + other.total,
            with_beta: self.with_beta + other.with_beta,
            with_se: self.with_se + other.with_se,
            with_z: self.with_z + other.with_z,
        }
    }
}

/// Convert all records from `reader` into `writer`, preserving order.
fn run_conversion(
    reader: &mut csv::Reader<Box<dyn BufRead>>,
    writer: &mut csv::Writer<Box<dyn Write>>,
    column_index: &ColumnIndex,
    params: &MungeParams,
    chunk_size: usize,
) -> Result<MungeCounters, anyhow::Error> {
    let start = std::time::Instant::now();
    let mut prev = std::time::Instant::now();
    let mut counters = MungeCounters::default();
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

        let out_records = chunk
            .par_iter()
            .map(|fields| {
                let record = VariantRecord::from_fields(fields, column_index);
                let effect = harmonize(&record, params);
                (effect.source, Record::new(record, &effect))
            })
            .collect::<Vec<_>>();

        for (i, (source, out_record)) in out_records.iter().enumerate() {
            if counters.total + i < TRACE_FIRST_RECORDS {
                tracing::debug!(
                    "{}: BETA={:?} SE={:?} Z={:?} ({})",
                    out_record.snp.as_deref().unwrap_or("."),
                    out_record.beta,
                    out_record.se,
                    out_record.z,
                    source.map_or_else(|| "none".to_string(), |rule| rule.to_string())
                );
            }
            writer
                .serialize(out_record)
                .map_err(|e| anyhow::anyhow!("failed to write record: {}", e))?;
        }
        counters = counters.merge(
            out_records
                .iter()
                .map(|(_, out_record)| out_record)
                .fold(MungeCounters::default(), MungeCounters::record),
        );

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at record {}", counters.total.separate_with_commas());
            prev = std::time::Instant::now();
        }
    }

    tracing::info!(
        "... converted {} records in {:?}",
        counters.total.separate_with_commas(),
        start.elapsed()
    );

    Ok(counters)
}

/// Main entry point for `sumstats munge` sub command.
pub fn run(
    args_common: &crate::common::Args,
    args: &Args,
) -> Result<MungeCounters, anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let params = MungeParams {
        logistic: args.logistic,
    };
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
        .write_record(OUTPUT_HEADER)
        .map_err(|e| anyhow::anyhow!("could not write header: {}", e))?;

    common::trace_rss_now();

    tracing::info!("starting conversion...");
    let counters = run_conversion(
        &mut reader,
        &mut writer,
        &column_index,
        &params,
        args.chunk_size,
    )?;
    writer.flush()?;
    tracing::info!("... done with conversion");

    tracing::info!(
        "summary: {} records, {} with BETA, {} with SE, {} with Z",
        counters.total.separate_with_commas(),
        counters.with_beta.separate_with_commas(),
        counters.with_se.separate_with_commas(),
        counters.with_z.separate_with_commas()
    );

    tracing::info!(
        "All of `sumstats munge` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(counters)
}
