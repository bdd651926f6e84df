use inferload_common::{FinalStats, ReplicaReport};

/// Nearest-rank percentile: sort ascending and return the element at index
/// `ceil(percentile / 100 * n) - 1`. Returns `None` for an empty slice.
///
/// Not the same estimator the generator uses for its
/// local percentiles (`floor(p * n)`); the two disagree on small samples.
pub fn nearest_rank(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[idx])
}

/// Combine replica reports into overall statistics.
/// `overall_average` is the mean of the reported averages, not a mean over raw samples.
pub fn compute_final_stats(reports: &[ReplicaReport]) -> Option<FinalStats> {
    if reports.is_empty() {
        return None;
    }
    let total_replicas = reports.len();
    let p50s: Vec<f64> = reports.iter().map(|r| r.p50).collect();
    let p95s: Vec<f64> = reports.iter().map(|r| r.p95).collect();
    let overall_average =
        reports.iter().map(|r| r.average_latency).sum::<f64>() / total_replicas as f64;

    Some(FinalStats {
        total_replicas,
        overall_average,
        overall_p50: nearest_rank(&p50s, 50.0)?,
        overall_p95: nearest_rank(&p95s, 95.0)?,
        replica_results: reports.to_vec(),
    })
}
