//! Detect command: common periods for every object of an observation table.

use anyhow::{Context, Result, anyhow};
use tracing::{info, info_span, warn};

use qhx_detect::{BatchConfig, run_batch};
use qhx_io::{read_observations, write_records_csv, write_records_parquet};

use crate::cli::DetectArgs;
use crate::config;
use crate::convert::{self, OutputFormat};

/// Run the batch detection pipeline.
pub fn run(args: DetectArgs) -> Result<()> {
    let _cmd = info_span!("detect").entered();

    // 1. Load config and merge CLI overrides
    let mut cfg = config::load(&args.config)?;
    if let Some(input) = args.input {
        cfg.io.input = Some(input);
    }
    if let Some(output) = args.output {
        cfg.io.output = Some(output);
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    if args.workers.is_some() {
        cfg.batch.workers = args.workers;
    }
    if !args.objects.is_empty() {
        cfg.batch.objects = args.objects;
    }

    let input = cfg
        .io
        .input
        .clone()
        .ok_or_else(|| anyhow!("no input path: set [io].input in config or use --input"))?;
    let output = cfg
        .io
        .output
        .clone()
        .ok_or_else(|| anyhow!("no output path: set [io].output in config or use --output"))?;

    // 2. Build library configs before touching any data
    let seed = cfg.seed.unwrap_or_else(rand::random);
    info!(seed, "using seed");
    let format = convert::parse_output_format(cfg.io.format.as_deref(), &output)?;
    let detection = convert::build_detection_config(&cfg)?;
    let reader = convert::build_reader_config(&cfg.io, seed)?;
    let writer = convert::build_writer_config(&cfg.io)?;
    let mut batch = BatchConfig::new()
        .with_seed(seed)
        .with_workers(cfg.batch.workers.unwrap_or(0));
    if !cfg.batch.objects.is_empty() {
        batch = batch.with_object_ids(cfg.batch.objects.clone());
    }

    // 3. Read the observation table
    let table = read_observations(&input, &reader)
        .with_context(|| format!("failed to read observations: {}", input.display()))?;
    info!(n_objects = table.n_objects(), mode = detection.mode().name(), "table loaded");

    // 4. Detect
    let report = run_batch(&table, &detection, &batch).context("batch detection failed")?;
    for failure in &report.failures {
        let band = failure.band.as_ref().map_or("-", |b| b.as_str());
        if failure.fatal {
            warn!(
                object_id = %failure.object_id,
                band,
                stage = %failure.stage,
                error = %failure.message,
                "object skipped"
            );
        } else {
            info!(
                object_id = %failure.object_id,
                band,
                stage = %failure.stage,
                error = %failure.message,
                "band skipped"
            );
        }
    }

    // 5. Write records
    match format {
        OutputFormat::Csv => write_records_csv(&output, &report.records),
        OutputFormat::Parquet => write_records_parquet(&output, &report.records, &writer),
    }
    .with_context(|| format!("failed to write records: {}", output.display()))?;

    let n_failed = report.failed_objects().len();
    info!(
        n_objects = report.n_objects,
        n_failed,
        n_records = report.records.len(),
        path = %output.display(),
        "detection complete"
    );
    if n_failed > 0 {
        warn!(n_failed, "some objects produced no records");
    }
    Ok(())
}
