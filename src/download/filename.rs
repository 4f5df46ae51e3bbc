//! Filename stem sanitization and collision-safe path resolution.
//!
//! Citations become filenames through [`sanitize_stem`], which normalizes to
//! lower-case ASCII words joined by hyphens and clamps the result to the
//! host filesystem's path and name limits for the destination directory.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

/// Characters reserved out of the host limits for the extension and the
/// directory separator.
pub const PATH_SAFETY_MARGIN: usize = 4;

/// Fallback total-path limit when the host cannot be queried.
pub const DEFAULT_PATH_MAX: usize = 4096;

/// Fallback path-component limit when the host cannot be queried.
pub const DEFAULT_NAME_MAX: usize = 255;

/// Effective length limits for files written into one directory.
///
/// Both values already have [`PATH_SAFETY_MARGIN`] subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLimits {
    /// Maximum length of `destination_dir + stem`.
    pub path_max: usize,
    /// Maximum length of `stem`.
    pub name_max: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self::from_host_values(DEFAULT_PATH_MAX, DEFAULT_NAME_MAX)
    }
}

impl PathLimits {
    /// Builds limits from raw host values, applying the safety margin.
    #[must_use]
    pub fn from_host_values(path_max: usize, name_max: usize) -> Self {
        Self {
            path_max: path_max.saturating_sub(PATH_SAFETY_MARGIN),
            name_max: name_max.saturating_sub(PATH_SAFETY_MARGIN),
        }
    }

    /// Queries the host filesystem limits for `dir`.
    ///
    /// Uses `pathconf(3)` on Unix. Falls back to [`DEFAULT_PATH_MAX`] and
    /// [`DEFAULT_NAME_MAX`] when the query fails or reports no limit.
    #[must_use]
    pub fn for_dir(dir: &Path) -> Self {
        let path_max = host_limit(dir, HostLimit::Path).unwrap_or(DEFAULT_PATH_MAX);
        let name_max = host_limit(dir, HostLimit::Name).unwrap_or(DEFAULT_NAME_MAX);
        trace!(path_max, name_max, dir = %dir.display(), "host path limits");
        Self::from_host_values(path_max, name_max)
    }
}

#[derive(Debug, Clone, Copy)]
enum HostLimit {
    Path,
    Name,
}

#[cfg(unix)]
fn host_limit(dir: &Path, limit: HostLimit) -> Option<usize> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes()).ok()?;
    let name = match limit {
        HostLimit::Path => libc::_PC_PATH_MAX,
        HostLimit::Name => libc::_PC_NAME_MAX,
    };
    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let value = unsafe { libc::pathconf(c_path.as_ptr(), name) };
    usize::try_from(value).ok().filter(|v| *v > 0)
}

#[cfg(not(unix))]
fn host_limit(_dir: &Path, _limit: HostLimit) -> Option<usize> {
    None
}

/// Normalizes `citation` into a filename stem for files under `destination_dir`.
///
/// Queries the host limits for `destination_dir`; see
/// [`sanitize_stem_with_limits`] for the transformation itself.
#[must_use]
pub fn sanitize_stem(citation: &str, destination_dir: &Path) -> String {
    sanitize_stem_with_limits(citation, destination_dir, PathLimits::for_dir(destination_dir))
}

/// Normalizes `citation` into a filename stem using explicit limits.
///
/// Steps, in order:
/// 1. NFKD decomposition, dropping everything that is not ASCII afterwards
///    (combining marks and characters with no ASCII equivalent)
/// 2. Remove characters that are not word characters, whitespace, or `-`
/// 3. Trim surrounding whitespace
/// 4. Lower-case
/// 5. Collapse runs of whitespace, `-` and `_` into a single `-`
/// 6. Truncate so that `destination_dir + stem` fits `limits.path_max` and
///    `stem` fits `limits.name_max`
///
/// The output only contains `[a-z0-9-]` and may be empty. Applying it to its
/// own output is a no-op.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use scihub_core::download::{PathLimits, sanitize_stem_with_limits};
///
/// let stem = sanitize_stem_with_limits(
///     "Stützle, T. — Iterated Local Search: Framework & Applications",
///     Path::new("/tmp/out"),
///     PathLimits::default(),
/// );
/// assert_eq!(stem, "stutzle-t-iterated-local-search-framework-applications");
/// ```
#[must_use]
pub fn sanitize_stem_with_limits(
    citation: &str,
    destination_dir: &Path,
    limits: PathLimits,
) -> String {
    let ascii: String = citation.nfkd().filter(char::is_ascii).collect();

    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || is_space(*c))
        .collect();

    let lowered = kept.trim_matches(is_space).to_ascii_lowercase();

    let mut stem = String::with_capacity(lowered.len());
    let mut in_separator = false;
    for ch in lowered.chars() {
        if ch == '-' || ch == '_' || is_space(ch) {
            if !in_separator {
                stem.push('-');
                in_separator = true;
            }
        } else {
            stem.push(ch);
            in_separator = false;
        }
    }

    let dir_len = destination_dir.as_os_str().len();
    let max_len = stem_budget(destination_dir, limits);
    if stem.len() > max_len {
        debug!(
            original_len = stem.len(),
            max_len,
            dir_len,
            "truncating filename stem to host limits"
        );
        truncate_at_char_boundary(&mut stem, max_len);
    }

    stem
}

/// ASCII whitespace in the regex `\s` sense: includes vertical tab and the
/// `\x1C`..`\x1F` separators.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\x1C'..='\x1F').contains(&c)
}

/// Longest stem that fits both the name limit and the path limit for `dir`.
fn stem_budget(dir: &Path, limits: PathLimits) -> usize {
    limits
        .path_max
        .saturating_sub(dir.as_os_str().len())
        .min(limits.name_max)
}

fn truncate_at_char_boundary(value: &mut String, max_len: usize) {
    let mut end = max_len.min(value.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}

/// Resolves a unique file path for `stem` + `extension` inside `dir`.
///
/// Tries `stem.ext`, then `stem-2.ext`, `stem-3.ext`, ... The stem is
/// shortened as needed so the numeric suffix does not push the name past
/// `limits.name_max`, nor `dir + name` past `limits.path_max`. An empty stem
/// is replaced by `article`.
#[must_use]
pub fn resolve_unique_path(dir: &Path, stem: &str, extension: &str, limits: PathLimits) -> PathBuf {
    let stem = if stem.is_empty() { "article" } else { stem };
    let extension = extension.trim_start_matches('.');
    let base_path = dir.join(format!("{stem}.{extension}"));

    if !base_path.exists() {
        return base_path;
    }

    let max_len = stem_budget(dir, limits);
    for i in 2..10_000 {
        let suffix = format!("-{i}");
        let mut shortened = stem.to_string();
        let budget = max_len.saturating_sub(suffix.len());
        if shortened.len() > budget {
            truncate_at_char_boundary(&mut shortened, budget);
        }
        let candidate = dir.join(format!("{shortened}{suffix}.{extension}"));
        if !candidate.exists() {
            debug!(path = %candidate.display(), "resolved collision with numeric suffix");
            return candidate;
        }
    }

    // Fallback (extremely unlikely)
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}-{timestamp}.{extension}"))
}
