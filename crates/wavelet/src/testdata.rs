//! Synthetic harmonic packets for exercising the superlet transforms.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Concatenated few-cycle packets, one group per frequency.
///
/// For every `f` in `freqs` the signal gets a 5-cycle silent pad, a packet
/// of `cycles` cycles at `f` superposed with `f + 10`, a 2-cycle gap, and
/// `cycles` cycles of the pure harmonic at `f`. A final pad closes the
/// signal. Gaussian white noise of standard deviation `eps` is added when
/// `eps > 0`.
pub fn gen_superlet_testdata<R: Rng + ?Sized>(
    freqs: &[f64],
    cycles: f64,
    fs: f64,
    eps: f64,
    rng: &mut R,
) -> Vec<f64> {
    let mut signal = Vec::new();
    let mut pad_len = 0;
    for &freq in freqs {
        let n = ((cycles / freq) * fs).ceil().max(0.0) as usize;
        let harmonic: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).cos())
            .collect();
        let packet = (0..n).map(|i| {
            let t = i as f64 / fs;
            harmonic[i] + (2.0 * PI * (freq + 10.0) * t).cos()
        });
        let gap_len = (2.0 / freq * fs) as usize;
        pad_len = (5.0 / freq * fs) as usize;

        signal.extend(std::iter::repeat_n(0.0, pad_len));
        signal.extend(packet);
        signal.extend(std::iter::repeat_n(0.0, gap_len));
        signal.extend_from_slice(&harmonic);
    }
    signal.extend(std::iter::repeat_n(0.0, pad_len));

    if eps > 0.0 {
        for x in &mut signal {
            let z: f64 = StandardNormal.sample(rng);
            *x += eps * z;
        }
    }
    signal
}
