/* src/server/core/rust/src/ttl.rs */

use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Parse a duration made of `<number><unit>` parts ("300ms", "1.5h", "1h30m").
/// Units are ns, us/µs, ms, s, m and h. Signs are rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
  let s = input.trim();
  if s.is_empty() {
    return None;
  }
  if s == "0" {
    return Some(Duration::ZERO);
  }

  let mut total = 0f64;
  let mut rest = s;
  while !rest.is_empty() {
    let num_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
    if num_len == 0 {
      return None;
    }
    let value: f64 = rest[..num_len].parse().ok()?;
    rest = &rest[num_len..];

    let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
    let nanos_per_unit = match &rest[..unit_len] {
      "ns" => 1.0,
      "us" | "µs" | "μs" => 1e3,
      "ms" => 1e6,
      "s" => 1e9,
      "m" => 60e9,
      "h" => 3600e9,
      _ => return None,
    };
    rest = &rest[unit_len..];
    total += value * nanos_per_unit;
  }

  if !total.is_finite() || total > u64::MAX as f64 {
    return None;
  }
  Some(Duration::from_nanos(total as u64))
}

/// `Cache-Control` value for a page TTL, falling back to one hour.
pub fn cache_control(ttl: Option<&str>) -> String {
  let ttl = ttl.and_then(parse_duration).unwrap_or(DEFAULT_TTL);
  format!("public, max-age={}", ttl.as_secs())
}
