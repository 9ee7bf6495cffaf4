use std::collections::HashMap;

use crate::core::ssh::probe_error::ProbeError;
use crate::domain::hardware::model::hardware_info::{round1, HardwareMetrics};

/// Everything a probe needs in one exec. Each section starts with a `@@name`
/// marker line; missing tools just leave their section empty.
pub const PROBE_SCRIPT: &str = "\
echo @@thermal; cat /sys/class/thermal/thermal_zone0/temp 2>/dev/null; \
echo @@vcgencmd_temp; vcgencmd measure_temp 2>/dev/null; \
echo @@throttled; vcgencmd get_throttled 2>/dev/null; \
echo @@stat; head -n 1 /proc/stat; sleep 1; head -n 1 /proc/stat; \
echo @@meminfo; cat /proc/meminfo; \
echo @@df; df -P /";

const SECTION_MARKER: &str = "@@";

/// `vcgencmd get_throttled` bits: 0-3 current, 16-19 since boot.
const THROTTLE_FLAGS: [(u32, &str); 8] = [
    (0x1, "under_voltage"),
    (0x2, "arm_frequency_capped"),
    (0x4, "throttled"),
    (0x8, "soft_temp_limit"),
    (0x1_0000, "under_voltage_occurred"),
    (0x2_0000, "arm_frequency_capped_occurred"),
    (0x4_0000, "throttled_occurred"),
    (0x8_0000, "soft_temp_limit_occurred"),
];

pub fn parse_probe_output(output: &str) -> Result<HardwareMetrics, ProbeError> {
    let sections = split_sections(output);
    let section = |name: &str| sections.get(name).map(Vec::as_slice).unwrap_or(&[]);

    let cpu_temperature =
        parse_thermal_zone(section("thermal")).or_else(|| parse_vcgencmd_temp(section("vcgencmd_temp")));

    Ok(HardwareMetrics {
        cpu_temperature: cpu_temperature.map(round1),
        cpu_usage_percent: round1(parse_cpu_usage(section("stat"))?),
        memory_usage_percent: round1(parse_memory_usage(section("meminfo"))?),
        disk_usage_percent: parse_disk_usage(section("df"))?,
        throttle_status: parse_throttled(section("throttled")),
    })
}

fn split_sections(output: &str) -> HashMap<&str, Vec<&str>> {
    let mut sections: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut current: Option<&str> = None;

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(name) = line.strip_prefix(SECTION_MARKER) {
            current = Some(name);
            sections.entry(name).or_default();
        } else if let Some(name) = current {
            sections.entry(name).or_default().push(line);
        }
    }
    sections
}

/// Millidegrees Celsius.
fn parse_thermal_zone(lines: &[&str]) -> Option<f64> {
    let raw: f64 = lines.first()?.parse().ok()?;
    Some(raw / 1000.0)
}

/// `temp=48.3'C`
fn parse_vcgencmd_temp(lines: &[&str]) -> Option<f64> {
    let value = lines.first()?.strip_prefix("temp=")?;
    let digits: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// `throttled=0x50005`
fn parse_throttled(lines: &[&str]) -> Vec<String> {
    let Some(bits) = lines
        .first()
        .and_then(|l| l.strip_prefix("throttled="))
        .and_then(|hex| u32::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
    else {
        return Vec::new();
    };

    THROTTLE_FLAGS
        .iter()
        .filter(|(mask, _)| bits & mask != 0)
        .map(|(_, name)| name.to_string())
        .collect()
}

struct CpuSample {
    idle: u64,
    total: u64,
}

fn parse_cpu_line(line: &str) -> Option<CpuSample> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let values: Vec<u64> = fields.map(|f| f.parse().ok()).collect::<Option<_>>()?;
    if values.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    // guest time is already folded into user/nice
    let total = values.iter().take(8).sum();
    Some(CpuSample { idle, total })
}

fn parse_cpu_usage(lines: &[&str]) -> Result<f64, ProbeError> {
    let samples: Vec<CpuSample> = lines.iter().filter_map(|l| parse_cpu_line(l)).collect();
    let [first, second] = samples.as_slice() else {
        return Err(ProbeError::Parse(format!(
            "expected two /proc/stat samples, got {}",
            samples.len()
        )));
    };

    let total = second.total.saturating_sub(first.total);
    let idle = second.idle.saturating_sub(first.idle);
    if total == 0 {
        return Ok(0.0);
    }
    Ok(total.saturating_sub(idle) as f64 / total as f64 * 100.0)
}

fn meminfo_kib(lines: &[&str], key: &str) -> Option<u64> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn parse_memory_usage(lines: &[&str]) -> Result<f64, ProbeError> {
    let total = meminfo_kib(lines, "MemTotal")
        .filter(|t| *t > 0)
        .ok_or_else(|| ProbeError::Parse("MemTotal missing from /proc/meminfo".into()))?;
    let available = meminfo_kib(lines, "MemAvailable")
        .ok_or_else(|| ProbeError::Parse("MemAvailable missing from /proc/meminfo".into()))?;

    Ok((1.0 - available.min(total) as f64 / total as f64) * 100.0)
}

/// POSIX `df -P` output: header, then `fs blocks used avail capacity% mount`.
fn parse_disk_usage(lines: &[&str]) -> Result<f64, ProbeError> {
    lines
        .iter()
        .skip(1)
        .find_map(|line| {
            let capacity = line.split_whitespace().nth(4)?;
            capacity.strip_suffix('%')?.parse::<f64>().ok()
        })
        .ok_or_else(|| ProbeError::Parse("no capacity column in df output".into()))
}
