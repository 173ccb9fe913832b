pub fn get_progress_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(
        "{percent:>3}% |{wide_bar}| {pos}/{len} branches [{elapsed_precise}<{eta_precise}, {per_sec}]",
    )
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
    .progress_chars("██ ")
}

/// Format a rate as a percentage with `digits` decimals
pub fn format_percent(value: f64, digits: usize) -> String {
    format!("{:.*} %", digits, value)
}
