//! Rating normalization tables.
//!
//! Four closed canonical scales: TV (1-7), MPAA (1-8), star (1-7) and
//! color code (1-4). Vendor spellings normalize to a canonical integer;
//! canonical integers render back to one display string per kind. Unmapped
//! display lookups fall back to a kind-specific default rather than
//! failing.

/// A rating kind, selecting one of the closed canonical scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Tv,
    Mpaa,
    Star,
    Color,
}

impl Kind {
    /// The rating kind a record field holds, if any.
    pub fn for_field(field: &str) -> Option<Kind> {
        match field {
            "tvRating" => Some(Kind::Tv),
            "mpaaRating" => Some(Kind::Mpaa),
            "starRating" => Some(Kind::Star),
            "colorCode" => Some(Kind::Color),
            _ => None,
        }
    }
}

/// Normalize a raw vendor token to its canonical integer.
///
/// The token is trimmed and uppercased before lookup. Unknown tokens yield
/// `None`; the caller decides whether to drop the field or fall back to
/// integer coercion.
pub fn canonical(kind: Kind, token: &str) -> Option<i64> {
    let token = token.trim().to_uppercase();
    let value = match kind {
        Kind::Tv => match token.as_str() {
            "TV-Y7" | "TVY7" | "Y7" | "X1" => 1,
            "TV-Y" | "TVY" | "Y" | "X2" => 2,
            "TV-G" | "TVG" | "G" | "X3" => 3,
            "TV-PG" | "TVPG" | "PG" | "X4" => 4,
            "TV-14" | "TV14" | "14" | "X5" => 5,
            "TV-MA" | "TVMA" | "MA" | "X6" => 6,
            "TV-NR" | "TVNR" | "NR" | "UNRATED" | "X7" => 7,
            _ => return None,
        },
        Kind::Mpaa => match token.as_str() {
            "G" | "G1" => 1,
            "PG" | "P2" => 2,
            "PG-13" | "PG13" | "P3" => 3,
            "R" | "R4" => 4,
            "X" | "X5" => 5,
            "NC-17" | "NC17" | "N6" => 6,
            "NR" | "UNRATED" | "N8" => 8,
            _ => return None,
        },
        Kind::Star => match token.as_str() {
            "1" | "*" | "X1" => 1,
            "1.5" | "X2" => 2,
            "2" | "**" | "X3" => 3,
            "2.5" | "X4" => 4,
            "3" | "***" | "X5" => 5,
            "3.5" | "X6" => 6,
            "4" | "****" | "X7" => 7,
            _ => return None,
        },
        Kind::Color => return None,
    };
    Some(value)
}

/// Display string for a canonical value, or `None` when unmapped.
pub fn display_known(kind: Kind, value: i64) -> Option<&'static str> {
    let text = match kind {
        Kind::Tv => match value {
            1 => "Y7",
            2 => "Y",
            3 => "G",
            4 => "PG",
            5 => "14",
            6 => "MA",
            7 => "NR",
            _ => return None,
        },
        Kind::Mpaa => match value {
            1 => "G",
            2 => "PG",
            3 => "PG-13",
            4 => "R",
            5 => "X",
            6 => "NC-17",
            8 => "NR",
            _ => return None,
        },
        Kind::Star => match value {
            1 => "1",
            2 => "1.5",
            3 => "2",
            4 => "2.5",
            5 => "3",
            6 => "3.5",
            7 => "4",
            _ => return None,
        },
        Kind::Color => match value {
            1 => "B & W",
            2 => "COLOR AND B & W",
            3 => "COLORIZED",
            4 => "COLOR",
            _ => return None,
        },
    };
    Some(text)
}

/// Total display lookup with the kind-specific default for unmapped values.
pub fn display(kind: Kind, value: i64) -> &'static str {
    display_known(kind, value).unwrap_or(match kind {
        Kind::Tv | Kind::Mpaa => "NR",
        Kind::Star => "",
        Kind::Color => "COLOR",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_normalize_case_insensitively() {
        assert_eq!(canonical(Kind::Tv, "tv-pg"), Some(4));
        assert_eq!(canonical(Kind::Tv, "  TV-MA "), Some(6));
        assert_eq!(canonical(Kind::Mpaa, "pg-13"), Some(3));
        assert_eq!(canonical(Kind::Star, "***"), Some(5));
    }

    #[test]
    fn test_unknown_tokens_yield_none() {
        assert_eq!(canonical(Kind::Tv, "AWFUL"), None);
        assert_eq!(canonical(Kind::Mpaa, "PG-14"), None);
        assert_eq!(canonical(Kind::Color, "COLOR"), None);
    }

    #[test]
    fn test_display_defaults() {
        assert_eq!(display(Kind::Tv, 99), "NR");
        assert_eq!(display(Kind::Mpaa, 7), "NR");
        assert_eq!(display(Kind::Star, 0), "");
        assert_eq!(display(Kind::Color, 9), "COLOR");
    }

    #[test]
    fn test_display_round_trips_through_a_raw_token() {
        // Every canonical integer must map back to itself through at least
        // one raw spelling of its display string.
        for value in 1..=7 {
            let shown = display_known(Kind::Tv, value).unwrap();
            assert_eq!(canonical(Kind::Tv, shown), Some(value));
        }
        for value in [1, 2, 3, 4, 5, 6, 8] {
            let shown = display_known(Kind::Mpaa, value).unwrap();
            assert_eq!(canonical(Kind::Mpaa, shown), Some(value));
        }
        for value in 1..=7 {
            let shown = display_known(Kind::Star, value).unwrap();
            assert_eq!(canonical(Kind::Star, shown), Some(value));
        }
    }
}
