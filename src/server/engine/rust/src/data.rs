/* src/server/engine/rust/src/data.rs */

//! Conversion from JSON context values to mustache data.
//!
//! Numbers are carried as their exact decimal text so that large integers
//! decoded from backend payloads render without float rounding.
//!
//! mustache can only interpolate strings, so values reached from a variable
//! tag (`{{flag}}`, `{{{list}}}`) must already be text. [`TagUsage`] records
//! which names a template interpolates and which it walks into or iterates;
//! names only ever interpolated are converted to text (`true`, `false`, or
//! compact JSON for arrays and objects).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use mustache::Data;
use serde_json::Value;

/// Partials nested deeper than this are not scanned.
const MAX_PARTIAL_DEPTH: usize = 8;

/// Extension mustache appends to partial names.
const PARTIAL_EXTENSION: &str = "mustache";

/// How a template refers to context names.
#[derive(Debug, Clone, Default)]
pub struct TagUsage {
  /// Last path segment of every variable tag
  interpolated: HashSet<String>,
  /// Section names and inner path segments
  structural: HashSet<String>,
}

impl TagUsage {
  /// Scan `source` alone; `{{> partial}}` tags are ignored.
  pub fn scan(source: &str) -> Self {
    let mut usage = Self::default();
    usage.scan_source(source, None, 0);
    usage
  }

  /// Scan `source` and every partial it includes from `partials_dir`.
  pub fn scan_with_partials(source: &str, partials_dir: &Path) -> Self {
    let mut usage = Self::default();
    usage.scan_source(source, Some(partials_dir), 0);
    usage
  }

  /// Whether values under `name` are only ever interpolated.
  pub fn is_text(&self, name: &str) -> bool {
    self.interpolated.contains(name) && !self.structural.contains(name)
  }

  fn scan_source(&mut self, source: &str, partials_dir: Option<&Path>, depth: usize) {
    let mut otag = "{{".to_string();
    let mut ctag = "}}".to_string();
    let mut rest = source;

    while let Some(start) = rest.find(otag.as_str()) {
      let after = &rest[start + otag.len()..];
      if otag == "{{" && after.starts_with('{') {
        let Some(end) = after.find("}}}") else { break };
        self.variable(&after[1..end]);
        rest = &after[end + 3..];
        continue;
      }

      let Some(end) = after.find(ctag.as_str()) else { break };
      let tag = after[..end].trim();
      rest = &after[end + ctag.len()..];

      match tag.as_bytes().first() {
        None | Some(b'!' | b'/') => {}
        Some(b'#' | b'^') => self.section(&tag[1..]),
        Some(b'&') => self.variable(&tag[1..]),
        Some(b'>') => {
          if let Some(dir) = partials_dir
            && depth < MAX_PARTIAL_DEPTH
          {
            let path = dir.join(format!("{}.{PARTIAL_EXTENSION}", tag[1..].trim()));
            if let Ok(partial) = std::fs::read_to_string(path) {
              self.scan_source(&partial, partials_dir, depth + 1);
            }
          }
        }
        Some(b'=') => {
          let inner = tag.trim_start_matches('=').trim_end_matches('=');
          let mut delims = inner.split_whitespace();
          if let (Some(open), Some(close)) = (delims.next(), delims.next()) {
            otag = open.to_string();
            ctag = close.to_string();
          }
        }
        Some(_) => self.variable(tag),
      }
    }
  }

  fn variable(&mut self, name: &str) {
    let name = name.trim();
    if name.is_empty() || name == "." {
      return;
    }
    let mut segments: Vec<&str> = name.split('.').collect();
    if let Some(last) = segments.pop() {
      self.interpolated.insert(last.to_string());
    }
    self.structural.extend(segments.into_iter().map(str::to_string));
  }

  fn section(&mut self, name: &str) {
    let name = name.trim();
    if name.is_empty() || name == "." {
      return;
    }
    self.structural.extend(name.split('.').map(str::to_string));
  }
}

/// Structural conversion: objects become maps, arrays vectors, booleans
/// stay booleans.
pub fn to_data(value: &Value) -> Data {
  to_data_with(value, &TagUsage::default())
}

/// Conversion for a template with the given tag usage.
pub fn to_data_with(value: &Value, usage: &TagUsage) -> Data {
  match value {
    Value::Null => Data::Null,
    Value::Bool(b) => Data::Bool(*b),
    Value::Number(n) => Data::String(n.to_string()),
    Value::String(s) => Data::String(s.clone()),
    Value::Array(items) => Data::Vec(items.iter().map(|v| to_data_with(v, usage)).collect()),
    Value::Object(map) => {
      let mut out = HashMap::with_capacity(map.len());
      for (k, v) in map {
        let data = if usage.is_text(k) { to_text(v) } else { to_data_with(v, usage) };
        out.insert(k.clone(), data);
      }
      Data::Map(out)
    }
  }
}

fn to_text(value: &Value) -> Data {
  match value {
    Value::Null => Data::Null,
    Value::String(s) => Data::String(s.clone()),
    Value::Number(n) => Data::String(n.to_string()),
    Value::Bool(b) => Data::String(b.to_string()),
    Value::Array(_) | Value::Object(_) => Data::String(value.to_string()),
  }
}
