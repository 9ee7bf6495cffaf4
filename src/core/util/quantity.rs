//! Kubernetes resource quantity helpers.
//!
//! Quantities arrive as strings (`"4"`, `"3500m"`, `"8032604Ki"`, `"1.5Gi"`);
//! these helpers turn them into plain numbers and back into display strings.

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

const DECIMAL_SUFFIXES: [(&str, f64); 8] = [
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
];

pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parses any quantity into its base unit (cores for CPU, bytes for memory).
/// Suffixes are case-sensitive: `m` is milli, `M` is mega.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|v| v * factor);
        }
    }

    // `1e3` style exponents parse directly.
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }

    for (suffix, factor) in DECIMAL_SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|v| v * factor);
        }
    }

    None
}

pub fn parse_cpu_cores(raw: &str) -> Option<f64> {
    parse_quantity(raw).filter(|v| *v >= 0.0)
}

pub fn parse_memory_bytes(raw: &str) -> Option<u64> {
    parse_quantity(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// `16.0` -> `"16"`, `3.5` -> `"3.5"`.
pub fn format_cores(cores: f64) -> String {
    if (cores - cores.round()).abs() < 1e-9 {
        format!("{}", cores.round() as i64)
    } else {
        let s = format!("{cores:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Bytes rendered in GiB with one decimal, e.g. `"31.2Gi"`.
pub fn format_gib(bytes: u64) -> String {
    format!("{:.1}Gi", bytes as f64 / BYTES_PER_GIB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_quantities() {
        assert_eq!(parse_cpu_cores("4"), Some(4.0));
        assert_eq!(parse_cpu_cores("3500m"), Some(3.5));
        assert_eq!(parse_cpu_cores("250m"), Some(0.25));
        assert_eq!(parse_cpu_cores(""), None);
        assert_eq!(parse_cpu_cores("four"), None);
    }

    #[test]
    fn memory_quantities_respect_suffix_case() {
        assert_eq!(parse_memory_bytes("8Ki"), Some(8 * 1024));
        assert_eq!(parse_memory_bytes("512Mi"), Some(512 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1.5Gi"), Some(1_610_612_736));
        assert_eq!(parse_memory_bytes("1M"), Some(1_000_000));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("1000"), Some(1000));
    }

    #[test]
    fn formatting() {
        assert_eq!(format_cores(16.0), "16");
        assert_eq!(format_cores(3.5), "3.5");
        assert_eq!(format_gib(8 * 1024 * 1024 * 1024), "8.0Gi");
        assert_eq!(format_gib(parse_memory_bytes("7901Mi").unwrap()), "7.7Gi");
    }
}
