// Byte-count formatting in powers of 1024.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SizeUnit {
    #[value(name = "B")]
    B,
    #[value(name = "KB")]
    Kb,
    #[value(name = "MB")]
    Mb,
    #[value(name = "GB")]
    Gb,
    #[value(name = "TB")]
    Tb,
    #[value(name = "PB")]
    Pb,
}

impl SizeUnit {
    pub const ALL: [SizeUnit; 6] = [
        SizeUnit::B,
        SizeUnit::Kb,
        SizeUnit::Mb,
        SizeUnit::Gb,
        SizeUnit::Tb,
        SizeUnit::Pb,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SizeUnit::B => "B",
            SizeUnit::Kb => "KB",
            SizeUnit::Mb => "MB",
            SizeUnit::Gb => "GB",
            SizeUnit::Tb => "TB",
            SizeUnit::Pb => "PB",
        }
    }

    pub fn bytes(self) -> u64 {
        1u64 << (10 * self as u32)
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeUnit::ALL
            .into_iter()
            .find(|u| u.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown size unit '{s}'"))
    }
}

/// Largest unit keeping the value at or above 1, e.g. `1536 -> "1.5KB"`.
pub fn humanize(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = SizeUnit::B;
    for next in &SizeUnit::ALL[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = *next;
    }
    format!("{}{}", one_decimal(value), unit)
}

/// Value expressed in a fixed unit, e.g. `humanize_in(1 << 20, SizeUnit::Kb) == "1024KB"`.
pub fn humanize_in(bytes: u64, unit: SizeUnit) -> String {
    format!("{}{}", one_decimal(bytes as f64 / unit.bytes() as f64), unit)
}

/// Inverse of [`humanize`]. Accepts an optional space before the unit; no unit means bytes.
pub fn dehumanize(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let unit = if unit.is_empty() {
        SizeUnit::B
    } else {
        unit.parse().ok()?
    };
    Some((value * unit.bytes() as f64).round() as u64)
}

fn one_decimal(value: f64) -> String {
    let s = format!("{value:.1}");
    match s.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => s,
    }
}
