//! Flat metric naming.

/// Build the reported key for one sample of one metric.
///
/// The key is `prefix/metric/suffix`, or `metric/suffix` when there is no
/// prefix. A prefix that is empty or all whitespace counts as no prefix; any
/// other prefix is used verbatim. The pieces are joined as given; metric names
/// containing `/` are not escaped.
pub fn resolve(prefix: Option<&str>, metric: &str, suffix: &str) -> String {
    match prefix {
        Some(p) if !p.trim().is_empty() => format!("{}/{}/{}", p, metric, suffix),
        _ => format!("{}/{}", metric, suffix),
    }
}
