//! Semantic version parsing, range algebra, and version selection.
//!
//! This is the one subsystem every other module depends on, so it is kept
//! free of any external semver crate: `Version` and `Range` are parsed and
//! compared entirely by hand, following the SemVer 2.0.0 precedence rules.
//!
//! # Examples
//!
//! ```
//! use npmx_core::semver::{Version, Range, SatisfyOptions};
//!
//! let v = Version::parse("1.2.3").unwrap();
//! let range = Range::parse("^1.0.0").unwrap();
//! assert!(range.satisfies(&v, &SatisfyOptions::default()));
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, ErrorCode};

/// A single dot-separated identifier within a prerelease or build string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u64),
    Alpha(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::Alpha(s) => write!(f, "{}", s),
        }
    }
}

impl Identifier {
    /// Parses one dot-separated component of a prerelease or build string.
    /// `allow_leading_zero` is true for build metadata, false for prerelease
    /// (build identifiers carry no numeric precedence, so leading zeroes are
    /// harmless there; prerelease numeric identifiers must not have them).
    fn parse(raw: &str, allow_leading_zero: bool) -> Result<Self, SemverError> {
        if raw.is_empty() {
            return Err(SemverError::InvalidVersion("empty identifier".into()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(SemverError::InvalidVersion(format!(
                "invalid identifier '{}'",
                raw
            )));
        }
        let is_numeric = raw.bytes().all(|b| b.is_ascii_digit());
        if is_numeric {
            if !allow_leading_zero && raw.len() > 1 && raw.starts_with('0') {
                return Err(SemverError::InvalidVersion(format!(
                    "numeric identifier '{}' has a leading zero",
                    raw
                )));
            }
            let n: u64 = raw
                .parse()
                .map_err(|_| SemverError::InvalidVersion(format!("identifier '{}' overflows", raw)))?;
            Ok(Identifier::Numeric(n))
        } else {
            Ok(Identifier::Alpha(raw.to_string()))
        }
    }
}

/// `(major, minor, patch, prerelease-identifiers, build-metadata)`.
///
/// Equality and ordering ignore build metadata, per SemVer 2.0.0: two
/// versions that differ only in build metadata compare equal.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<Identifier>,
    pub build: Vec<Identifier>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: Vec::new(),
        }
    }

    pub fn with_pre(mut self, pre: Vec<Identifier>) -> Self {
        self.pre = pre;
        self
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Accepts an optional leading `v`. Rejects negative components, leading
    /// zeroes in numeric identifiers (except a bare `0`), empty identifiers,
    /// non-ASCII characters, and whitespace.
    pub fn parse(input: &str) -> Result<Self, SemverError> {
        if input.is_empty() {
            return Err(SemverError::InvalidVersion("empty version string".into()));
        }
        if !input.is_ascii() {
            return Err(SemverError::InvalidVersion(
                "version string must be ASCII".into(),
            ));
        }
        if input.chars().any(|c| c.is_whitespace()) {
            return Err(SemverError::InvalidVersion(
                "version string must not contain whitespace".into(),
            ));
        }

        let rest = input.strip_prefix('v').unwrap_or(input);

        // Split off build metadata first (it may itself contain '-').
        let (core_and_pre, build) = match rest.split_once('+') {
            Some((a, b)) => (a, Some(b)),
            None => (rest, None),
        };

        // The first '-' after the numeric core starts the prerelease.
        let (core, pre) = split_core_and_prerelease(core_and_pre)?;

        let mut parts = core.split('.');
        let major = parse_numeric_component(parts.next(), "major")?;
        let minor = parse_numeric_component(parts.next(), "minor")?;
        let patch = parse_numeric_component(parts.next(), "patch")?;
        if parts.next().is_some() {
            return Err(SemverError::InvalidVersion(format!(
                "too many numeric components in '{}'",
                input
            )));
        }

        let pre = match pre {
            Some(p) if !p.is_empty() => p
                .split('.')
                .map(|id| Identifier::parse(id, false))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SemverError::InvalidVersion("empty prerelease".into())),
            None => Vec::new(),
        };

        let build = match build {
            Some(b) if !b.is_empty() => b
                .split('.')
                .map(|id| Identifier::parse(id, true))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SemverError::InvalidVersion("empty build metadata".into())),
            None => Vec::new(),
        };

        Ok(Version {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }

    /// Strictly follows SemVer precedence; build metadata is ignored.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| compare_prerelease(&self.pre, &other.pre))
    }

    /// `(major, minor, patch)` equal and same prerelease identifiers, per
    /// `compare`; used by the hyphen-range and caret/tilde desugaring below
    /// where callers need to compare only the release triple.
    fn core_eq(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(
                f,
                "-{}",
                self.pre
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join(".")
            )?;
        }
        if !self.build.is_empty() {
            write!(
                f,
                "+{}",
                self.build
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join(".")
            )?;
        }
        Ok(())
    }
}

fn split_core_and_prerelease(s: &str) -> Result<(&str, Option<&str>), SemverError> {
    match s.find('-') {
        Some(idx) => Ok((&s[..idx], Some(&s[idx + 1..]))),
        None => Ok((s, None)),
    }
}

fn parse_numeric_component(raw: Option<&str>, label: &str) -> Result<u64, SemverError> {
    let raw = raw.ok_or_else(|| SemverError::InvalidVersion(format!("missing {} component", label)))?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SemverError::InvalidVersion(format!(
            "invalid {} component '{}'",
            label, raw
        )));
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(SemverError::InvalidVersion(format!(
            "{} component '{}' has a leading zero",
            label, raw
        )));
    }
    raw.parse()
        .map_err(|_| SemverError::InvalidVersion(format!("{} component '{}' overflows", label, raw)))
}

/// Numeric identifiers compare numerically and sort lower than alphanumeric
/// ones; alphanumeric identifiers compare lexicographically (ASCII byte
/// order); a version with fewer prerelease identifiers has lower precedence
/// when every shared identifier compares equal; no prerelease outranks any
/// prerelease at the same release triple.
fn compare_prerelease(a: &[Identifier], b: &[Identifier]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x, y) {
            (Identifier::Numeric(n1), Identifier::Numeric(n2)) => n1.cmp(n2),
            (Identifier::Numeric(_), Identifier::Alpha(_)) => Ordering::Less,
            (Identifier::Alpha(_), Identifier::Numeric(_)) => Ordering::Greater,
            (Identifier::Alpha(s1), Identifier::Alpha(s2)) => s1.cmp(s2),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Errors raised while parsing versions or ranges. `NotARange` is a distinct
/// kind so callers can tell "a bare dist tag or URL, not a range" apart from
/// a range that's simply malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemverError {
    InvalidVersion(String),
    InvalidRange(String),
    NotARange(String),
}

impl fmt::Display for SemverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemverError::InvalidVersion(m) => write!(f, "invalid version: {}", m),
            SemverError::InvalidRange(m) => write!(f, "invalid range: {}", m),
            SemverError::NotARange(m) => write!(f, "not a version range: {}", m),
        }
    }
}

impl std::error::Error for SemverError {}

impl From<SemverError> for Error {
    fn from(e: SemverError) -> Self {
        Error::Parse(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

#[derive(Debug, Clone)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn matches(&self, v: &Version) -> bool {
        match self.op {
            Op::Lt => v.compare(&self.version) == Ordering::Less,
            Op::Le => v.compare(&self.version) != Ordering::Greater,
            Op::Eq => v.compare(&self.version) == Ordering::Equal,
            Op::Ge => v.compare(&self.version) != Ordering::Less,
            Op::Gt => v.compare(&self.version) == Ordering::Greater,
        }
    }
}

/// A disjunction of comparator sets (`||`-joined clauses); each clause is a
/// conjunction of primitive comparators.
#[derive(Debug, Clone)]
pub struct Range {
    clauses: Vec<Vec<Comparator>>,
}

/// Controls whether prerelease versions are visible to range matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatisfyOptions {
    pub include_prerelease: bool,
}

struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Vec<Identifier>,
}

impl Range {
    pub fn parse(input: &str) -> Result<Self, SemverError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("x") {
            return Ok(Range {
                clauses: vec![vec![Comparator {
                    op: Op::Ge,
                    version: Version::new(0, 0, 0),
                }]],
            });
        }
        if looks_like_tag_or_url(trimmed) {
            return Err(SemverError::NotARange(trimmed.to_string()));
        }

        let mut clauses = Vec::new();
        for raw_clause in trimmed.split("||") {
            clauses.push(parse_clause(raw_clause.trim())?);
        }
        Ok(Range { clauses })
    }

    /// Evaluates the disjunction and applies the prerelease visibility rule:
    /// a version with a non-empty prerelease satisfies the range only if the
    /// satisfying clause contains a comparator naming the same
    /// `(major, minor, patch)` and itself carrying a prerelease, unless
    /// `include_prerelease` is set.
    pub fn satisfies(&self, version: &Version, options: &SatisfyOptions) -> bool {
        for clause in &self.clauses {
            if !clause.iter().all(|c| c.matches(version)) {
                continue;
            }
            if !version.is_prerelease() || options.include_prerelease {
                return true;
            }
            let visible = clause
                .iter()
                .any(|c| c.version.core_eq(version) && c.version.is_prerelease());
            if visible {
                return true;
            }
        }
        false
    }
}

fn looks_like_tag_or_url(s: &str) -> bool {
    if s.contains("://") {
        return true;
    }
    let first = s.chars().next().unwrap_or('\0');
    !(first.is_ascii_digit()
        || first == 'v'
        || first == '^'
        || first == '~'
        || first == '>'
        || first == '<'
        || first == '='
        || first == '*'
        || first.eq_ignore_ascii_case(&'x'))
}

fn parse_clause(raw: &str) -> Result<Vec<Comparator>, SemverError> {
    if raw.is_empty() {
        return Ok(vec![Comparator {
            op: Op::Ge,
            version: Version::new(0, 0, 0),
        }]);
    }

    // Hyphen range: "<a> - <b>", spaces mandatory around the dash so
    // prerelease/build hyphens inside a single version token are untouched.
    if let Some((lo, hi)) = split_hyphen_range(raw) {
        let lo = parse_partial(lo)?;
        let hi = parse_partial(hi)?;
        let mut out = vec![Comparator {
            op: Op::Ge,
            version: lo.lower_bound(),
        }];
        out.push(match hi.upper_bound_inclusive() {
            Some(v) => Comparator { op: Op::Le, version: v },
            None => Comparator {
                op: Op::Lt,
                version: hi.exclusive_upper_bound(),
            },
        });
        return Ok(out);
    }

    let mut comparators = Vec::new();
    for token in tokenize_clause(raw) {
        comparators.extend(parse_token(&token)?);
    }
    if comparators.is_empty() {
        return Err(SemverError::InvalidRange(format!(
            "empty comparator set in '{}'",
            raw
        )));
    }
    Ok(comparators)
}

/// Splits `raw` on a ` - ` that is not inside a version's own identifiers.
/// Each side of a hyphen range is a whitespace-free partial version, so a
/// single space-delimited `-` between two tokens is unambiguous.
fn split_hyphen_range(raw: &str) -> Option<(&str, &str)> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let pos = tokens.iter().position(|t| *t == "-")?;
    if pos == 0 || pos == tokens.len() - 1 {
        return None;
    }
    // Reconstruct original slice boundaries by locating first/second halves.
    let lo_end = raw.find(" - ")?;
    let hi_start = lo_end + 3;
    Some((raw[..lo_end].trim(), raw[hi_start..].trim()))
}

/// Splits a clause into whitespace-separated comparator tokens, re-joining
/// an operator that was written with a space before its version (`>= 1.2.3`).
fn tokenize_clause(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending: Option<String> = None;
    for word in raw.split_whitespace() {
        if let Some(prefix) = pending.take() {
            tokens.push(format!("{}{}", prefix, word));
            continue;
        }
        if matches!(word, ">=" | "<=" | ">" | "<" | "=") {
            pending = Some(word.to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    if let Some(p) = pending {
        tokens.push(p);
    }
    tokens
}

fn parse_token(token: &str) -> Result<Vec<Comparator>, SemverError> {
    if let Some(rest) = token.strip_prefix("^") {
        return Ok(caret_range(&parse_partial(rest)?));
    }
    if let Some(rest) = token.strip_prefix('~') {
        return Ok(tilde_range(&parse_partial(rest)?));
    }
    if let Some(rest) = token.strip_prefix(">=") {
        let p = parse_partial(rest)?;
        return Ok(vec![Comparator { op: Op::Ge, version: p.lower_bound() }]);
    }
    if let Some(rest) = token.strip_prefix("<=") {
        let p = parse_partial(rest)?;
        return Ok(vec![match p.upper_bound_inclusive() {
            Some(v) => Comparator { op: Op::Le, version: v },
            None => Comparator { op: Op::Lt, version: p.exclusive_upper_bound() },
        }]);
    }
    if let Some(rest) = token.strip_prefix('>') {
        let p = parse_partial(rest)?;
        return Ok(vec![Comparator { op: Op::Gt, version: p.exclusive_upper_bound_for_gt() }]);
    }
    if let Some(rest) = token.strip_prefix('<') {
        let p = parse_partial(rest)?;
        return Ok(vec![Comparator { op: Op::Lt, version: p.lower_bound() }]);
    }
    if let Some(rest) = token.strip_prefix('=') {
        return Ok(exact_or_partial_range(&parse_partial(rest)?));
    }
    // Bare version or X-range.
    Ok(exact_or_partial_range(&parse_partial(token)?))
}

fn exact_or_partial_range(p: &Partial) -> Vec<Comparator> {
    match (p.major, p.minor, p.patch) {
        (Some(_), Some(_), Some(_)) => vec![Comparator { op: Op::Eq, version: p.lower_bound() }],
        _ => vec![
            Comparator { op: Op::Ge, version: p.lower_bound() },
            Comparator { op: Op::Lt, version: p.exclusive_upper_bound() },
        ],
    }
}

fn caret_range(p: &Partial) -> Vec<Comparator> {
    let lower = p.lower_bound();
    let upper = match (p.major, p.minor, p.patch) {
        (Some(0), Some(0), Some(_)) => Version::new(0, 0, lower.patch + 1),
        (Some(0), Some(0), None) => Version::new(0, 1, 0),
        (Some(0), Some(m), _) if m > 0 => Version::new(0, m + 1, 0),
        (Some(0), None, _) => Version::new(1, 0, 0),
        (Some(0), _, _) => Version::new(0, 1, 0),
        (Some(major), _, _) if major > 0 => Version::new(major + 1, 0, 0),
        _ => Version::new(1, 0, 0),
    };
    vec![
        Comparator { op: Op::Ge, version: lower },
        Comparator { op: Op::Lt, version: upper },
    ]
}

fn tilde_range(p: &Partial) -> Vec<Comparator> {
    let lower = p.lower_bound();
    let upper = match p.minor {
        Some(minor) => Version::new(p.major.unwrap_or(0), minor + 1, 0),
        None => Version::new(p.major.unwrap_or(0) + 1, 0, 0),
    };
    vec![
        Comparator { op: Op::Ge, version: lower },
        Comparator { op: Op::Lt, version: upper },
    ]
}

fn parse_partial(raw: &str) -> Result<Partial, SemverError> {
    let raw = raw.trim().strip_prefix('v').unwrap_or(raw.trim());
    let (core, pre) = match raw.split_once('-') {
        Some((c, p)) => (c, Some(p)),
        None => (raw, None),
    };
    // Build metadata on a partial comparator is accepted and discarded: it
    // never participates in precedence.
    let core = core.split('+').next().unwrap_or(core);

    let mut components = core.split('.');
    let major = parse_partial_component(components.next())?;
    let minor = parse_partial_component(components.next())?;
    let patch = parse_partial_component(components.next())?;

    let pre = match pre {
        Some(p) if !p.is_empty() => p
            .split('.')
            .map(|id| Identifier::parse(id, false))
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    Ok(Partial { major, minor, patch, pre })
}

fn parse_partial_component(raw: Option<&str>) -> Result<Option<u64>, SemverError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) if s == "x" || s == "X" || s == "*" => Ok(None),
        Some(s) => {
            if !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SemverError::InvalidRange(format!(
                    "invalid numeric component '{}'",
                    s
                )));
            }
            if s.len() > 1 && s.starts_with('0') {
                return Err(SemverError::InvalidRange(format!(
                    "component '{}' has a leading zero",
                    s
                )));
            }
            s.parse()
                .map(Some)
                .map_err(|_| SemverError::InvalidRange(format!("component '{}' overflows", s)))
        }
    }
}

impl Partial {
    fn lower_bound(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: Vec::new(),
        }
    }

    /// `<=` bound when every component was explicit; `None` when the partial
    /// needs the wildcard-upper-bound treatment instead (e.g. `<=1.2`).
    fn upper_bound_inclusive(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(ma), Some(mi), Some(pa)) => Some(Version::new(ma, mi, pa)),
            _ => None,
        }
    }

    /// The exclusive upper bound implied by treating missing components as
    /// wildcards: `1.2` means `1.2.x`, so the exclusive bound is `1.3.0`.
    fn exclusive_upper_bound(&self) -> Version {
        match (self.major, self.minor, self.patch) {
            (Some(ma), Some(mi), Some(_)) => Version::new(ma, mi, mi_patch_bump(self, ma, mi)),
            (Some(ma), Some(mi), None) => Version::new(ma, mi + 1, 0),
            (Some(ma), None, _) => Version::new(ma + 1, 0, 0),
            (None, _, _) => Version::new(0, 0, 0),
        }
    }

    /// `>1.2` means `>=1.3.0`; `>1.2.3` means strictly greater than the exact
    /// triple. Used only by the `>` comparator.
    fn exclusive_upper_bound_for_gt(&self) -> Version {
        match (self.major, self.minor, self.patch) {
            (Some(ma), Some(mi), Some(pa)) => Version::new(ma, mi, pa),
            (Some(ma), Some(mi), None) => Version::new(ma, mi + 1, 0).prior_patch(),
            (Some(ma), None, _) => Version::new(ma + 1, 0, 0).prior_patch(),
            (None, _, _) => Version::new(0, 0, 0),
        }
    }
}

fn mi_patch_bump(p: &Partial, _ma: u64, _mi: u64) -> u64 {
    p.patch.unwrap_or(0) + 1
}

impl Version {
    /// Used only to express `>X.Y` as `>=` of the version immediately below
    /// the wildcard's exclusive bound, since `Gt` with an exclusive-bound
    /// version would incorrectly exclude the bound's own predecessor range.
    fn prior_patch(mut self) -> Self {
        if self.patch > 0 {
            self.patch -= 1;
        } else if self.minor > 0 {
            self.minor -= 1;
            self.patch = 0;
        } else if self.major > 0 {
            self.major -= 1;
        }
        self
    }
}

/// Returns the greatest version in `versions` satisfying `range`, or `None`.
/// Deterministic: the same input set and range always return the same
/// version, regardless of input ordering.
pub fn max_satisfying<'a>(
    versions: &'a [Version],
    range: &Range,
    options: &SatisfyOptions,
) -> Option<&'a Version> {
    versions
        .iter()
        .filter(|v| range.satisfies(v, options))
        .max_by(|a, b| a.compare(b).then_with(|| a.build.cmp(&b.build)))
}

/// Returns the smallest version in `versions` satisfying `range`, or `None`.
pub fn min_satisfying<'a>(
    versions: &'a [Version],
    range: &Range,
    options: &SatisfyOptions,
) -> Option<&'a Version> {
    versions
        .iter()
        .filter(|v| range.satisfies(v, options))
        .min_by(|a, b| a.compare(b).then_with(|| a.build.cmp(&b.build)))
}

pub fn satisfies(version: &Version, range: &Range, options: &SatisfyOptions) -> bool {
    range.satisfies(version, options)
}

/// The kind of change between two versions, per npm's `semver.diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Major,
    Minor,
    Patch,
    PreMajor,
    PreMinor,
    PrePatch,
    Prerelease,
}

pub fn diff(a: &Version, b: &Version) -> Option<DiffKind> {
    if a.compare(b) == Ordering::Equal {
        return None;
    }
    let v1_higher = a.compare(b) == Ordering::Greater;
    let (high, low) = if v1_higher { (a, b) } else { (b, a) };
    let high_has_pre = high.is_prerelease();
    let low_has_pre = low.is_prerelease();

    if low_has_pre && !high_has_pre {
        if low.patch == 0 && low.minor == 0 {
            return Some(DiffKind::Major);
        }
        if high.patch != 0 {
            return Some(DiffKind::Patch);
        }
        if high.minor != 0 {
            return Some(DiffKind::Minor);
        }
        return Some(DiffKind::Major);
    }

    let pre = high_has_pre;
    if a.major != b.major {
        return Some(if pre { DiffKind::PreMajor } else { DiffKind::Major });
    }
    if a.minor != b.minor {
        return Some(if pre { DiffKind::PreMinor } else { DiffKind::Minor });
    }
    if a.patch != b.patch {
        return Some(if pre { DiffKind::PrePatch } else { DiffKind::Patch });
    }
    Some(DiffKind::Prerelease)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn opts() -> SatisfyOptions {
        SatisfyOptions::default()
    }

    #[test]
    fn parses_basic_versions() {
        let version = v("1.2.3");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert!(version.pre.is_empty());
        assert!(version.build.is_empty());
    }

    #[test]
    fn accepts_leading_v() {
        assert_eq!(v("v1.2.3"), v("1.2.3"));
    }

    #[test]
    fn rejects_leading_zero() {
        assert!(Version::parse("01.2.3").is_err());
        assert!(Version::parse("1.2.03").is_err());
    }

    #[test]
    fn rejects_negative_and_whitespace() {
        assert!(Version::parse("-1.2.3").is_err());
        assert!(Version::parse("1.2. 3").is_err());
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(Version::parse("1.2.3-β").is_err());
    }

    #[test]
    fn build_metadata_ignored_in_equality() {
        assert_eq!(v("1.2.3+build1"), v("1.2.3+build2"));
    }

    #[test]
    fn prerelease_has_lower_precedence() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
    }

    #[test]
    fn numeric_prerelease_identifiers_compare_numerically() {
        assert!(v("1.0.0-alpha.2") < v("1.0.0-alpha.10"));
    }

    #[test]
    fn alphanumeric_outranks_numeric_prerelease_identifier() {
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
    }

    #[test]
    fn shorter_prerelease_is_lower_when_shared_prefix_equal() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
    }

    #[test]
    fn total_order_is_transitive_and_antisymmetric() {
        let a = v("1.0.0-alpha");
        let b = v("1.0.0-alpha.1");
        let c = v("1.0.0");
        assert!(a < b && b < c && a < c);
        assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn caret_desugars_per_major_minor_patch_rules() {
        let r = Range::parse("^1.2.3").unwrap();
        assert!(r.satisfies(&v("1.2.3"), &opts()));
        assert!(r.satisfies(&v("1.9.9"), &opts()));
        assert!(!r.satisfies(&v("2.0.0"), &opts()));

        let r0 = Range::parse("^0.2.3").unwrap();
        assert!(r0.satisfies(&v("0.2.9"), &opts()));
        assert!(!r0.satisfies(&v("0.3.0"), &opts()));

        let r00 = Range::parse("^0.0.3").unwrap();
        assert!(r00.satisfies(&v("0.0.3"), &opts()));
        assert!(!r00.satisfies(&v("0.0.4"), &opts()));
    }

    #[test]
    fn caret_with_omitted_patch_on_zero_zero_is_wide_not_patch_locked() {
        // ^0.0 and ^0.0.x have no explicit patch, so they fall back to the
        // wide <0.1.0 bound rather than ^0.0.3's narrow <0.0.4 one.
        let r = Range::parse("^0.0").unwrap();
        assert!(r.satisfies(&v("0.0.0"), &opts()));
        assert!(r.satisfies(&v("0.0.9"), &opts()));
        assert!(r.satisfies(&v("0.0.99"), &opts()));
        assert!(!r.satisfies(&v("0.1.0"), &opts()));

        let rx = Range::parse("^0.0.x").unwrap();
        assert!(rx.satisfies(&v("0.0.5"), &opts()));
        assert!(!rx.satisfies(&v("0.1.0"), &opts()));
    }

    #[test]
    fn tilde_desugars_to_patch_level_range() {
        let r = Range::parse("~1.2.3").unwrap();
        assert!(r.satisfies(&v("1.2.9"), &opts()));
        assert!(!r.satisfies(&v("1.3.0"), &opts()));
    }

    #[test]
    fn wildcards_expand_to_bounded_ranges() {
        let r = Range::parse("1.x").unwrap();
        assert!(r.satisfies(&v("1.9.9"), &opts()));
        assert!(!r.satisfies(&v("2.0.0"), &opts()));

        let star = Range::parse("*").unwrap();
        assert!(star.satisfies(&v("999.0.0"), &opts()));
    }

    #[test]
    fn hyphen_range_expands_partial_bounds() {
        let r = Range::parse("1.2 - 2.3.4").unwrap();
        assert!(r.satisfies(&v("1.2.0"), &opts()));
        assert!(r.satisfies(&v("2.3.4"), &opts()));
        assert!(!r.satisfies(&v("2.3.5"), &opts()));

        let r2 = Range::parse("1.2.3 - 2.3").unwrap();
        assert!(r2.satisfies(&v("2.3.9"), &opts()));
        assert!(!r2.satisfies(&v("2.4.0"), &opts()));
    }

    #[test]
    fn or_clauses_are_disjunctive() {
        let r = Range::parse("1.0.0 || 2.0.0").unwrap();
        assert!(r.satisfies(&v("1.0.0"), &opts()));
        assert!(r.satisfies(&v("2.0.0"), &opts()));
        assert!(!r.satisfies(&v("1.5.0"), &opts()));
    }

    #[test]
    fn bare_tags_and_urls_are_rejected_distinctly() {
        assert!(matches!(
            Range::parse("latest"),
            Err(SemverError::NotARange(_))
        ));
        assert!(matches!(
            Range::parse("git+https://example.com/pkg.git"),
            Err(SemverError::NotARange(_))
        ));
    }

    #[test]
    fn prerelease_visibility_is_scoped_to_same_triple() {
        let r = Range::parse("^1.2.3").unwrap();
        // A prerelease of an unrelated version never satisfies, even though
        // it would satisfy the numeric range comparison alone.
        assert!(!r.satisfies(&v("1.2.4-beta"), &opts()));

        let exact = Range::parse(">=1.2.3-alpha <1.2.4").unwrap();
        assert!(exact.satisfies(&v("1.2.3-beta"), &opts()));
    }

    #[test]
    fn include_prerelease_flag_relaxes_visibility() {
        let r = Range::parse("^1.2.3").unwrap();
        let relaxed = SatisfyOptions { include_prerelease: true };
        assert!(r.satisfies(&v("1.2.4-beta"), &relaxed));
    }

    #[test]
    fn max_satisfying_picks_greatest_match() {
        let versions = vec![v("1.0.0"), v("1.2.0"), v("1.9.9"), v("2.0.0")];
        let r = Range::parse("^1.0.0").unwrap();
        let best = max_satisfying(&versions, &r, &opts()).unwrap();
        assert_eq!(*best, v("1.9.9"));
    }

    #[test]
    fn max_satisfying_is_deterministic_regardless_of_order() {
        let forward = vec![v("1.0.0"), v("1.5.0"), v("1.2.0")];
        let backward = vec![v("1.2.0"), v("1.5.0"), v("1.0.0")];
        let r = Range::parse("*").unwrap();
        assert_eq!(
            max_satisfying(&forward, &r, &opts()),
            max_satisfying(&backward, &r, &opts()).map(|x| x)
        );
    }

    #[test]
    fn max_satisfying_returns_none_when_nothing_matches() {
        let versions = vec![v("1.0.0"), v("1.1.0")];
        let r = Range::parse("^2.0.0").unwrap();
        assert!(max_satisfying(&versions, &r, &opts()).is_none());
    }

    #[test]
    fn min_satisfying_picks_smallest_match() {
        let versions = vec![v("1.0.0"), v("1.2.0"), v("1.9.9")];
        let r = Range::parse("^1.0.0").unwrap();
        assert_eq!(*min_satisfying(&versions, &r, &opts()).unwrap(), v("1.0.0"));
    }

    #[test]
    fn diff_reports_major_minor_patch() {
        assert_eq!(diff(&v("1.0.0"), &v("2.0.0")), Some(DiffKind::Major));
        assert_eq!(diff(&v("1.0.0"), &v("1.1.0")), Some(DiffKind::Minor));
        assert_eq!(diff(&v("1.0.0"), &v("1.0.1")), Some(DiffKind::Patch));
        assert_eq!(diff(&v("1.0.0"), &v("1.0.0")), None);
    }

    #[test]
    fn diff_reports_prerelease_variants() {
        assert_eq!(
            diff(&v("1.0.0-alpha"), &v("2.0.0-alpha")),
            Some(DiffKind::PreMajor)
        );
        assert_eq!(
            diff(&v("1.0.0-alpha.1"), &v("1.0.0-alpha.2")),
            Some(DiffKind::Prerelease)
        );
    }

    #[test]
    fn malformed_range_is_parse_error_not_false() {
        assert!(Range::parse("not-a-version").is_err());
    }

    proptest::proptest! {
        #[test]
        fn compare_is_a_total_order(
            a in 0u64..5, b in 0u64..5, c in 0u64..5,
            d in 0u64..5, e in 0u64..5, f in 0u64..5,
        ) {
            let x = Version::new(a, b, c);
            let y = Version::new(d, e, f);
            // antisymmetry
            if x.compare(&y) == Ordering::Less {
                proptest::prop_assert_eq!(y.compare(&x), Ordering::Greater);
            }
            // reflexivity
            proptest::prop_assert_eq!(x.compare(&x), Ordering::Equal);
        }
    }
}
