//! Classified query types.

use std::fmt;

/// Kind of query detected by [`classify`](super::classify).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// DOI identifier
    Doi,
    /// HTTP/HTTPS or bare-host URL
    Url,
    /// Title extracted from a citation line
    Title,
    /// Nothing usable was found
    Unrecognized,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doi => write!(f, "DOI"),
            Self::Url => write!(f, "URL"),
            Self::Title => write!(f, "Title"),
            Self::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

/// Outcome of classifying a raw query.
///
/// `Doi` and `Url` carry the matched substring verbatim; `Title` carries the
/// title field of the parsed citation. `Unrecognized` is a normal outcome,
/// not an error: the caller has to supply a more specific query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedQuery {
    /// Matched the DOI pattern.
    Doi(String),
    /// Matched the URL pattern.
    Url(String),
    /// Title extracted by the reference grammar.
    Title(String),
    /// No pattern matched.
    Unrecognized,
}

impl ClassifiedQuery {
    /// Returns the kind tag of this query.
    #[must_use]
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Doi(_) => QueryKind::Doi,
            Self::Url(_) => QueryKind::Url,
            Self::Title(_) => QueryKind::Title,
            Self::Unrecognized => QueryKind::Unrecognized,
        }
    }

    /// Returns the normalized query string to send to the search endpoint.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Doi(value) | Self::Url(value) | Self::Title(value) => Some(value),
            Self::Unrecognized => None,
        }
    }

    /// Returns true if no pattern matched.
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized)
    }
}

impl fmt::Display for ClassifiedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "[{}] {value}", self.kind()),
            None => write!(f, "[{}]", self.kind()),
        }
    }
}
