//! Final-value aggregation: IQR outlier rejection over the collected
//! candidates, then a median and a spread-derived confidence.

#[allow(unused_imports)]
use micromath::F32Ext;

/// Capacity of candidate buffers throughout the engine.
pub const MAX_CANDIDATES: usize = 128;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy)]
pub struct Aggregate {
    pub value: f32,
    /// 0.5 - 1.0
    pub confidence: f32,
    /// candidates surviving the outlier fence
    pub retained: usize,
}

/// Reduce raw per-sample candidates to one robust value.
///
/// Sorts in place. Quartiles are positional (`n/4`, `3n/4`, truncating) and
/// the median is the lower median (`n/2`); downstream scoring depends on
/// these exact indices, do not swap in interpolated quantiles. Returns
/// `None` only for an empty input; a fence that would reject everything
/// falls back to the unfiltered set instead.
pub fn robust_aggregate(candidates: &mut [f32]) -> Option<Aggregate> {
    if candidates.is_empty() {
        return None;
    }
    candidates
        .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));

    let n = candidates.len();
    let q1 = candidates[n / 4];
    let q3 = candidates[3 * n / 4];
    let iqr = q3 - q1;
    let lo = q1 - 1.5 * iqr;
    let hi = q3 + 1.5 * iqr;

    // sorted input, so the retained values are one contiguous run
    let start = candidates.partition_point(|&x| x < lo);
    let end = candidates.partition_point(|&x| x <= hi);
    let filtered: &[f32] = if start < end {
        &candidates[start..end]
    } else {
        log_debug!("outlier fence rejected all {} candidates, keeping the raw set", n);
        candidates
    };

    let value = filtered[filtered.len() / 2];
    let confidence = confidence_from_spread(stddev(filtered));

    Some(Aggregate {
        value,
        confidence,
        retained: filtered.len(),
    })
}

/// <=1 unit of spread reads as full confidence, >=5 floors at 0.5.
fn confidence_from_spread(stddev: f32) -> f32 {
    (1.0 - (stddev - 1.0) / 8.0).clamp(0.5, 1.0)
}

fn stddev(values: &[f32]) -> f32 {
    let n = values.len() as f32;
    let mean: f32 = values.iter().sum::<f32>() / n;
    let variance: f32 = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    variance.sqrt()
}
