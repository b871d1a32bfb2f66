//! Paths that are exposed without authentication (login, captcha, docs, ...).
//!
//! Pattern syntax:
//! - `**` matches any number of path segments (including none)
//! - `*` inside a segment matches any characters within that segment
//! - anything else matches literally

#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    patterns: Vec<Vec<String>>,
}

impl Whitelist {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| segments(p.as_ref()).map(str::to_string).collect())
                .collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = segments(path).collect();
        self.patterns
            .iter()
            .any(|pattern| match_segments(pattern, &path))
    }
}

fn segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').filter(|seg| !seg.is_empty())
}

fn match_segments(pattern: &[String], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((head, rest)) if head == "**" => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((head, rest)) => match path.split_first() {
            Some((seg, path_rest)) => glob(head, seg) && match_segments(rest, path_rest),
            None => false,
        },
    }
}

// Single-segment wildcard match, `*` = any run of characters.
fn glob(pattern: &str, text: &str) -> bool {
    let Some((first, rest)) = pattern.split_once('*') else {
        return pattern == text;
    };
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let mut parts = rest.split('*').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            // last literal must anchor at the end
            return remaining.len() >= part.len() && remaining.ends_with(part);
        }
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    true
}
