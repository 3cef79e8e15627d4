//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the inversion code stays clean and testable
//! - output changes are localized

use std::collections::BTreeMap;

use crate::domain::{Solution, SolveConfig, Weighting};
use crate::io::ingest::IngestedData;
use crate::report::{BenchmarkSummary, summarize_benchmarks};

/// Dataset, settings and fit diagnostics.
pub fn format_run_summary(ingest: Option<&IngestedData>, solution: &Solution, config: &SolveConfig) -> String {
    let mut out = String::new();

    out.push_str("=== ginv - relative gravity inversion ===\n");
    if let Some(ingest) = ingest {
        out.push_str(&format!(
            "Readings: n={} ({} skipped) | benchmarks={} | {} .. {}\n",
            ingest.stats.n_observations,
            ingest.row_errors.len(),
            ingest.stats.n_benchmarks,
            ingest.stats.first.format("%Y-%m-%d %H:%M:%S"),
            ingest.stats.last.format("%Y-%m-%d %H:%M:%S"),
        ));
        for err in ingest.row_errors.iter().take(5) {
            out.push_str(&format!("  line {}: {}\n", err.line, err.message));
        }
        if ingest.row_errors.len() > 5 {
            out.push_str(&format!("  ... {} more\n", ingest.row_errors.len() - 5));
        }
    }

    let d = &solution.diagnostics;
    out.push_str(&format!(
        "Settings: drift={} | weights={} | tide={} | anchor={}\n",
        solution.degree.display_name(),
        match config.weighting {
            Weighting::InverseVariance => "1/σ²",
            Weighting::Uniform => "uniform (OLS)",
        },
        if config.correct_tide { "corrected" } else { "uncorrected" },
        solution.anchor,
    ));
    out.push_str(&format!(
        "Fit: used={} params={} dof={} χ²={:.3} σ₀²={:.4}\n",
        d.n_observations, d.n_parameters, d.dof, d.chi_square, d.variance_factor
    ));

    out.push_str(&format!(
        "Drift: {:.1} μGal/day | coefficients {}\n",
        solution.drift_rate_per_day(),
        fmt_vec(&solution.drift_coefficients)
    ));
    if let Some(tare) = solution.tare {
        out.push_str(&format!(
            "Tare: {:.1} ± {:.1} μGal from reading #{}\n",
            tare.offset, tare.std_dev, tare.index
        ));
    }
    out.push('\n');

    out
}

/// Benchmark offsets with 2σ intervals.
pub fn format_benchmark_table(solution: &Solution) -> String {
    format_summaries(&summarize_benchmarks(solution))
}

fn format_summaries(rows: &[BenchmarkSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<16} {:>12} {:>10} {:>8} {:>10}\n",
        "benchmark", "dg (μGal)", "2σ (μGal)", "n", "rms"
    ));
    out.push_str(&format!("{:-<16} {:-<12} {:-<10} {:-<8} {:-<10}\n", "", "", "", "", ""));

    for r in rows {
        let name = if r.is_anchor {
            format!("{} *", truncate(&r.benchmark, 14))
        } else {
            truncate(&r.benchmark, 16)
        };
        out.push_str(&format!(
            "{:<16} {:>12.1} {:>10.1} {:>8} {:>10.2}\n",
            name,
            r.offset,
            r.two_sigma(),
            r.readings,
            r.rms_residual
        ));
    }
    out.push_str("(* anchor)\n");
    out
}

/// Per-reading reduced values and residuals.
pub fn format_residual_table(solution: &Solution) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:<19} {:<12} {:>12} {:>10} {:>10}\n",
        "#", "time (UTC)", "benchmark", "reduced", "drift", "residual"
    ));
    out.push_str(&format!("{:-<5} {:-<19} {:-<12} {:-<12} {:-<10} {:-<10}\n", "", "", "", "", "", ""));

    for r in &solution.reduced {
        out.push_str(&format!(
            "{:>5} {:<19} {:<12} {:>12.1} {:>10.1} {:>10.2}\n",
            r.index,
            r.time.format("%Y-%m-%d %H:%M:%S"),
            truncate(&r.benchmark, 12),
            r.reduced,
            r.drift,
            r.residual
        ));
    }
    out
}

/// Recovered vs. true offsets for synthetic surveys.
pub fn format_truth_comparison(solution: &Solution, true_offsets: &BTreeMap<String, f64>) -> String {
    let anchor_truth = true_offsets.get(&solution.anchor).copied().unwrap_or(0.0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<16} {:>12} {:>12} {:>10}\n",
        "benchmark", "true", "recovered", "error"
    ));
    out.push_str(&format!("{:-<16} {:-<12} {:-<12} {:-<10}\n", "", "", "", ""));
    for label in solution.benchmark_order() {
        let (Some(truth), Some(fit)) = (true_offsets.get(label), solution.offset(label)) else {
            continue;
        };
        let truth = truth - anchor_truth;
        out.push_str(&format!(
            "{:<16} {:>12.1} {:>12.1} {:>10.2}\n",
            truncate(label, 16),
            truth,
            fit.offset,
            fit.offset - truth
        ));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6e}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
