//! Route pattern compilation.
//!
//! A pattern is a `/`-separated path where any segment starting with `:`
//! names a parameter: `/user/:id`. The segment may carry its own capture
//! expression in parentheses, `/user/:id([0-9]+)`, which replaces the
//! default single-segment capture, and may span `/` as in
//! `/files/:path([a-z]+/[a-z]+)`. Every other segment is matched literally.
//!
//! Compiled patterns are anchored at both ends, so `/:id` matches `/admin`
//! but not `/admin/profile`.

use regex::Regex;

use crate::server::Error;

/// Marker that starts a parameter segment.
pub const PARAM_MARKER: char = ':';

/// Capture expression used when a parameter has none of its own.
pub const DEFAULT_CAPTURE: &str = "[^/]+";

/// A route pattern compiled into a matcher plus its parameter names.
///
/// The Nth entry of `params` names the Nth capture group.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
    params: Vec<String>,
}

impl CompiledPattern {
    /// Compile a pattern with the default capture expression.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Self::with_default_capture(pattern, DEFAULT_CAPTURE)
    }

    /// Compile a pattern, substituting `default_capture` for parameters
    /// that do not declare their own expression.
    pub fn with_default_capture(pattern: &str, default_capture: &str) -> Result<Self, Error> {
        let mut params = Vec::new();
        let mut parts = Vec::new();

        let mut segments = pattern.split('/');
        while let Some(segment) = segments.next() {
            let Some(rest) = segment.strip_prefix(PARAM_MARKER) else {
                parts.push(regex::escape(segment));
                continue;
            };

            // A capture expression may itself contain `/`
            let mut param = rest.to_string();
            while open_groups(&param) > 0 {
                let Some(next) = segments.next() else { break };
                param.push('/');
                param.push_str(next);
            }
            let rest = param.as_str();

            let (name, expr) = match rest.find('(') {
                Some(index) => (&rest[..index], rest[index..].to_string()),
                None => (rest, format!("({default_capture})")),
            };
            if name.is_empty() {
                return Err(malformed(pattern, "parameter segment has no name"));
            }
            params.push(name.to_string());
            parts.push(expr);
        }

        let expr = format!("^{}$", parts.join("/"));
        let regex = Regex::new(&expr).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let groups = regex.captures_len() - 1;
        if groups != params.len() {
            return Err(malformed(
                pattern,
                &format!("{} parameter(s) but {groups} capture group(s)", params.len()),
            ));
        }

        Ok(Self {
            source: pattern.to_string(),
            regex,
            params,
        })
    }

    /// The pattern string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in capture-group order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Whether the pattern declares any parameters.
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Whether `path` matches the whole pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and pair each parameter name with its captured value.
    ///
    /// Returns `None` if the path does not match. Groups that did not
    /// participate in the match yield an empty value.
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let caps = self.regex.captures(path)?;
        let values = self
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = caps.get(i + 1).map_or("", |m| m.as_str());
                (name.as_str(), value)
            })
            .collect();
        Some(values)
    }
}

/// Unclosed `(` in `expr`, ignoring backslash-escaped characters.
fn open_groups(expr: &str) -> usize {
    let mut depth = 0usize;
    let mut chars = expr.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

fn malformed(pattern: &str, reason: &str) -> Error {
    Error::MalformedPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// Whether a pattern contains a parameter segment.
pub fn has_param_marker(pattern: &str) -> bool {
    pattern.split('/').any(|segment| segment.starts_with(PARAM_MARKER))
}
