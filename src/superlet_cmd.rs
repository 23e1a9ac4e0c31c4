//! Superlet command: amplitude scalogram of one signal.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, info_span};

use qhx_wavelet::{SuperletConfig, TimeSeries, gen_superlet_testdata, superlet};

use crate::cli::SuperletArgs;
use crate::config::{self, QhxConfig};
use crate::convert;

/// Frequencies of the generated test signal, in Hz.
const TEST_FREQS: [f64; 3] = [20.0, 40.0, 60.0];
/// Cycles per test packet.
const TEST_CYCLES: f64 = 11.0;
/// Noise level of the test signal.
const TEST_NOISE: f64 = 0.0;

/// Run the superlet transform and write the amplitudes.
pub fn run(args: SuperletArgs) -> Result<()> {
    let _cmd = info_span!("superlet").entered();

    let cfg = match &args.config {
        Some(path) => config::load(path)?,
        None => QhxConfig::default(),
    };
    let slt: SuperletConfig = convert::build_superlet_config(&cfg.superlet)?;
    let freqs = frequencies(args.fmin, args.fmax, args.nfreq)?;

    let data = match &args.input {
        Some(path) => read_signal(path)?,
        None => {
            let seed = args.seed.or(cfg.seed).unwrap_or_else(rand::random);
            info!(seed, "generating test signal");
            let mut rng = StdRng::seed_from_u64(seed);
            gen_superlet_testdata(&TEST_FREQS, TEST_CYCLES, args.samplerate, TEST_NOISE, &mut rng)
        }
    };
    info!(n = data.len(), samplerate = args.samplerate, n_freq = freqs.len(), "signal ready");

    let series = TimeSeries::new(data, args.samplerate).context("invalid signal")?;
    let scales: Vec<f64> = freqs
        .iter()
        .map(|f| 1.0 / (2.0 * std::f64::consts::PI * f))
        .collect();
    let scalogram = superlet(&series, &scales, &slt).context("superlet transform failed")?;

    write_amplitudes(&args.output, &freqs, &scalogram.amplitude())?;
    info!(
        path = %args.output.display(),
        n_freq = scalogram.n_scales(),
        n_times = scalogram.n_times(),
        "scalogram written"
    );
    Ok(())
}

/// `n` evenly spaced frequencies from `fmin` to `fmax` inclusive.
fn frequencies(fmin: f64, fmax: f64, n: usize) -> Result<Vec<f64>> {
    if !(fmin.is_finite() && fmax.is_finite()) || fmin <= 0.0 || fmax < fmin {
        bail!("need 0 < fmin <= fmax, got {fmin}..{fmax}");
    }
    match n {
        0 => bail!("nfreq must be at least 1"),
        1 => Ok(vec![fmin]),
        _ => {
            let step = (fmax - fmin) / (n - 1) as f64;
            Ok((0..n).map(|i| fmin + step * i as f64).collect())
        }
    }
}

/// Reads the first comma-separated field of every non-empty line.
///
/// A first line that does not parse as a number is taken as a header.
fn read_signal(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read signal: {}", path.display()))?;
    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let field = line.split(',').next().unwrap_or("").trim();
        if field.is_empty() {
            continue;
        }
        match field.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) if values.is_empty() && lineno == 0 => {}
            Err(e) => bail!("{}:{}: invalid value {field:?}: {e}", path.display(), lineno + 1),
        }
    }
    Ok(values)
}

fn write_amplitudes(path: &Path, freqs: &[f64], amplitude: &[Vec<f64>]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let n_times = amplitude.first().map_or(0, Vec::len);

    write!(out, "frequency")?;
    for t in 0..n_times {
        write!(out, ",t{t}")?;
    }
    writeln!(out)?;
    for (f, row) in freqs.iter().zip(amplitude) {
        write!(out, "{f}")?;
        for a in row {
            write!(out, ",{a}")?;
        }
        writeln!(out)?;
    }
    out.flush()
        .with_context(|| format!("failed to write output: {}", path.display()))?;
    Ok(())
}
