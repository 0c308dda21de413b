//! Ant-style path patterns for paths exempt from tenant enforcement.
//!
//! `**` matches any number of segments (including none), `*` matches within
//! a single segment, `?` matches one character. `/actuator/**` therefore
//! matches `/actuator`, `/actuator/health` and `/actuator/health/liveness`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bypass pattern '{0}' must start with '/'")]
pub struct InvalidPatternError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Glob(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, InvalidPatternError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('/') {
            return Err(InvalidPatternError(raw.to_string()));
        }

        let mut segments: Vec<Segment> = Vec::new();
        for part in split_path(trimmed) {
            let segment = if part == "**" {
                Segment::AnyDepth
            } else {
                Segment::Glob(part.to_string())
            };
            // "/a/**/**" is the same as "/a/**"
            if segment == Segment::AnyDepth && segments.last() == Some(&Segment::AnyDepth) {
                continue;
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        if !path.starts_with('/') {
            return false;
        }
        let parts: Vec<&str> = split_path(path).collect();
        match_segments(&self.segments, &parts)
    }
}

/// Ordered set of bypass patterns; a path is bypassed when any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct BypassMatcher {
    patterns: Vec<PathPattern>,
}

impl BypassMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, InvalidPatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Returns the first matching pattern, if any.
    pub fn find_match(&self, path: &str) -> Option<&PathPattern> {
        self.patterns.iter().find(|pattern| pattern.matches(path))
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.find_match(path).is_some()
    }
}

// Empty segments are dropped, so `/health/` and `//health` compare equal to
// `/health`. Routing treats them as the same resource, so the bypass does too.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((head, tail)) => glob_matches(glob, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn glob_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // position of the last '*' seen, and where in the text it started matching
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, start)) = backtrack {
            pi = star + 1;
            ti = start + 1;
            backtrack = Some((star, start + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}
