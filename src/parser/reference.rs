//! Citation-line grammar: an optional author list followed by a title.
//!
//! The grammar is one composed regex anchored at the start of the line:
//!
//! ```text
//! ^(?:(?P<authors>FIRST (?:(?:SEP OTHER)+ | SEP et al\.)?), )?(?P<title>[^.]+\.?)
//! ```
//!
//! - `FIRST` is `Surname, I.` with one or more initials (`Fong, C.Y.`)
//! - `OTHER` is `I.I. Surname` (`D.C. Russell`)
//! - `SEP` is `, `, `, and ` or ` and `
//!
//! The author list is optional as a unit and must be followed by `, `.
//! When it is present the regex engine always prefers consuming it, so a
//! matching author prefix never leaks into the title. Titles stop at the
//! first period; a title that itself contains a period (an abbreviation,
//! a version number) is cut there. That limitation is part of the grammar.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

const FIRST_AUTHOR: &str = r"[A-Z][\w\-']+(?:,\s(?:[A-Z]\.)+)";
const OTHER_AUTHOR: &str = r"(?:[A-Z]\.)+\s[A-Z][\w\-']+";
const ET_AL: &str = r"et al\.";
const BETWEEN_AUTHORS: &str = r"(?:,?\sand\s|,\s)";

#[allow(clippy::expect_used)]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let authors = format!(
        r"(?:(?P<authors>{FIRST_AUTHOR}(?:(?:{BETWEEN_AUTHORS}{OTHER_AUTHOR})+|{BETWEEN_AUTHORS}{ET_AL})?),\s)?"
    );
    let title = r"(?P<title>[^.]+\.?)";
    Regex::new(&format!("^{authors}{title}")).expect("reference regex is valid") // Static pattern, safe to panic
});

/// What to do with the period that terminates the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalPeriod {
    /// Keep the terminal period in the captured title (`Title.`).
    #[default]
    Keep,
    /// Drop the terminal period from the captured title (`Title`).
    Drop,
}

/// A citation line split into its author list and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    /// The author list exactly as written, without the `, ` that separates
    /// it from the title. `None` when the line starts with the title.
    pub authors: Option<String>,
    /// The title, possibly including its terminal period (see [`TerminalPeriod`]).
    pub title: String,
}

impl fmt::Display for ParsedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authors {
            Some(authors) => write!(f, "{authors}, {}", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Reference grammar with a configurable terminal-period policy.
///
/// [`parse_reference`] uses the default policy ([`TerminalPeriod::Keep`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceParser {
    terminal_period: TerminalPeriod,
}

impl ReferenceParser {
    /// Creates a parser with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with an explicit terminal-period policy.
    #[must_use]
    pub fn with_terminal_period(terminal_period: TerminalPeriod) -> Self {
        Self { terminal_period }
    }

    /// Returns the configured terminal-period policy.
    #[must_use]
    pub fn terminal_period(&self) -> TerminalPeriod {
        self.terminal_period
    }

    /// Applies the grammar to `line`, anchored at its first character.
    ///
    /// Returns `None` only when no title character is available at the start
    /// of the line: the empty string, or a line starting with `.`.
    #[tracing::instrument(skip(self, line), fields(input_len = line.len()))]
    #[must_use]
    pub fn parse(&self, line: &str) -> Option<ParsedReference> {
        let Some(captures) = REFERENCE_PATTERN.captures(line) else {
            debug!("line does not match reference grammar");
            return None;
        };

        let authors = captures
            .name("authors")
            .map(|m| m.as_str().to_string());
        let raw_title = captures.name("title")?.as_str();
        let title = match self.terminal_period {
            TerminalPeriod::Keep => raw_title,
            TerminalPeriod::Drop => raw_title.strip_suffix('.').unwrap_or(raw_title),
        };

        debug!(
            has_authors = authors.is_some(),
            title_len = title.len(),
            "parsed reference"
        );
        Some(ParsedReference {
            authors,
            title: title.to_string(),
        })
    }
}

/// Parses a citation line with the default [`ReferenceParser`].
///
/// # Examples
///
/// ```
/// use scihub_core::parser::parse_reference;
///
/// let parsed = parse_reference(
///     "Fornes, P. and D. Lecomte, Pathology of sport-related sudden death. Revue du Praticien, 2001.",
/// )
/// .unwrap();
/// assert_eq!(parsed.authors.as_deref(), Some("Fornes, P. and D. Lecomte"));
/// assert_eq!(parsed.title, "Pathology of sport-related sudden death.");
/// ```
#[must_use]
pub fn parse_reference(line: &str) -> Option<ParsedReference> {
    ReferenceParser::new().parse(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_parses(line: &str, authors: Option<&str>, title: &str) {
        let parsed = parse_reference(line).unwrap();
        assert_eq!(parsed.authors.as_deref(), authors, "authors of: {line}");
        assert_eq!(parsed.title, title, "title of: {line}");
    }

    // ==================== Titles without authors ====================

    #[test]
    fn test_parse_plain_title_consumes_to_end() {
        assert_parses(
            "A heuristic algorithm for a single vehicle static bike sharing rebalancing problem",
            None,
            "A heuristic algorithm for a single vehicle static bike sharing rebalancing problem",
        );
    }

    #[test]
    fn test_parse_plain_title_with_colon() {
        assert_parses(
            "Iterated local search: Framework and applications",
            None,
            "Iterated local search: Framework and applications",
        );
    }

    #[test]
    fn test_parse_title_stops_at_first_period() {
        assert_parses(
            "Deep learning. Nature, 2015.",
            None,
            "Deep learning.",
        );
    }

    // ==================== Author list shapes ====================

    #[test]
    fn test_parse_single_author_with_initial() {
        assert_parses(
            "Force, S., The \"innocent bystander\" complications following esophagectomy: Atrial fibrillation, recurrent laryngeal nerve injury, chylothorax, and pulmonary complications. Seminars in Thoracic and Cardiovascular Surgery, 2004. 16(2): p. 117-123.",
            Some("Force, S."),
            "The \"innocent bystander\" complications following esophagectomy: Atrial fibrillation, recurrent laryngeal nerve injury, chylothorax, and pulmonary complications.",
        );
    }

    #[test]
    fn test_parse_single_author_et_al() {
        assert_parses(
            "Fong, C.Y., et al., Chloral hydrate as a sedating agent for neurodiagnostic procedures in children. Cochrane Database of Systematic Reviews, 2017. 2017(11).",
            Some("Fong, C.Y., et al."),
            "Chloral hydrate as a sedating agent for neurodiagnostic procedures in children.",
        );
    }

    #[test]
    fn test_parse_et_al_title_with_apostrophe() {
        assert_parses(
            "Forbes, H., et al., The Effects of Group Membership on College Students' Social Exclusion of Peers and Bystander Behavior. Journal of Psychology, 2020. 154(1): p. 15-37.",
            Some("Forbes, H., et al."),
            "The Effects of Group Membership on College Students' Social Exclusion of Peers and Bystander Behavior.",
        );
    }

    #[test]
    fn test_parse_multi_author_oxford_and() {
        assert_parses(
            "Forfar, J.C., D.C. Russell, and M.F. Oliver, Haemodynamic effects of sulphinpyrazone on exercise responses in normal subjects. Lancet, 1980. 2(8197): p. 718-20.",
            Some("Forfar, J.C., D.C. Russell, and M.F. Oliver"),
            "Haemodynamic effects of sulphinpyrazone on exercise responses in normal subjects.",
        );
    }

    #[test]
    fn test_parse_two_authors_plain_and() {
        assert_parses(
            "Fornes, P. and D. Lecomte, Pathology of sport-related sudden death. [French]. Revue du Praticien, 2001. 51(SPEC.ISS): p. 31-35.",
            Some("Fornes, P. and D. Lecomte"),
            "Pathology of sport-related sudden death.",
        );
    }

    #[test]
    fn test_parse_multi_author_title_with_hyphens_and_colon() {
        assert_parses(
            "Freedenberg, V.A., P.S. Hinds, and E. Friedmann, Mindfulness-Based Stress Reduction and Group Support Decrease Stress in Adolescents with Cardiac Diagnoses: A Randomized Two-Group Study. Pediatric Cardiology, 2017. 38(7): p. 1415-1425.",
            Some("Freedenberg, V.A., P.S. Hinds, and E. Friedmann"),
            "Mindfulness-Based Stress Reduction and Group Support Decrease Stress in Adolescents with Cardiac Diagnoses: A Randomized Two-Group Study.",
        );
    }

    #[test]
    fn test_parse_multi_author_comma_only_separators() {
        assert_parses(
            "Smith, J., A.B. Jones, C. Brown, Shared title here. Journal, 2001.",
            Some("Smith, J., A.B. Jones, C. Brown"),
            "Shared title here.",
        );
    }

    #[test]
    fn test_parse_hyphenated_and_apostrophe_surnames() {
        assert_parses(
            "O'Neil-Smith, K., On surnames. Names, 1999.",
            Some("O'Neil-Smith, K."),
            "On surnames.",
        );
    }

    // ==================== Fallback to "no authors" ====================

    #[test]
    fn test_parse_author_without_separator_falls_back_to_title() {
        // Author shape present but not followed by ", " before the title.
        assert_parses(
            "Smith, J. Title without comma separator.",
            None,
            "Smith, J.",
        );
    }

    #[test]
    fn test_parse_surname_without_initials_is_title() {
        assert_parses(
            "Smith, John, A title.",
            None,
            "Smith, John, A title.",
        );
    }

    #[test]
    fn test_parse_lowercase_start_has_no_authors() {
        assert_parses("fong, C.Y., lowercase.", None, "fong, C.");
    }

    // ==================== No-match cases ====================

    #[test]
    fn test_parse_empty_is_no_match() {
        assert_eq!(parse_reference(""), None);
    }

    #[test]
    fn test_parse_leading_period_is_no_match() {
        assert_eq!(parse_reference(". Nothing before the period"), None);
    }

    // ==================== Terminal period policy ====================

    #[test]
    fn test_drop_policy_strips_terminal_period() {
        let parser = ReferenceParser::with_terminal_period(TerminalPeriod::Drop);
        let parsed = parser
            .parse("Fong, C.Y., et al., Chloral hydrate as a sedating agent. Cochrane, 2017.")
            .unwrap();
        assert_eq!(parsed.authors.as_deref(), Some("Fong, C.Y., et al."));
        assert_eq!(parsed.title, "Chloral hydrate as a sedating agent");
    }

    #[test]
    fn test_drop_policy_leaves_title_without_period_unchanged() {
        let parser = ReferenceParser::with_terminal_period(TerminalPeriod::Drop);
        let parsed = parser.parse("Iterated local search").unwrap();
        assert_eq!(parsed.title, "Iterated local search");
    }

    #[test]
    fn test_default_policy_is_keep() {
        assert_eq!(ReferenceParser::new().terminal_period(), TerminalPeriod::Keep);
    }

    #[test]
    fn test_parsed_reference_display() {
        let parsed = parse_reference("Force, S., A title. Journal.").unwrap();
        assert_eq!(parsed.to_string(), "Force, S., A title.");
    }
}
