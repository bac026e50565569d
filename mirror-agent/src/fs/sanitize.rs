//! Sanitization of remote display names into safe local path segments.

/// Characters that are illegal in file names on common filesystems.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize a single path segment.
///
/// Illegal characters become `_`, runs of whitespace collapse to a single
/// space, and leading/trailing spaces and dots are trimmed. Total: never
/// fails, but may return an empty string, so callers always combine the
/// result with a parent segment or an id-based fallback.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for c in raw.chars() {
        if ILLEGAL_CHARS.contains(&c) {
            out.push('_');
            in_whitespace = false;
        } else if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }

    out.trim_matches(|c| c == ' ' || c == '.').to_string()
}

/// Sanitize a `/`-separated relative path, dropping segments that sanitize
/// to nothing.
pub fn sanitize_rel_path(raw: &str) -> String {
    raw.split('/')
        .map(sanitize)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Stable directory name for a group's mirror: `<id>_<sanitized name>`.
pub fn group_dir_name(id: i64, name: &str) -> String {
    format!("{}_{}", id, sanitize(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_illegal_characters() {
        assert_eq!(sanitize("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_trims_spaces_and_dots() {
        assert_eq!(sanitize("  report.pdf.  "), "report.pdf");
        assert_eq!(sanitize("...hidden"), "hidden");
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(sanitize("Week   1\t\tnotes"), "Week 1 notes");
    }

    #[test]
    fn test_empty_and_degenerate_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize(" . . "), "");
        assert_eq!(sanitize("***"), "___");
    }

    #[test]
    fn test_sanitize_rel_path_per_segment() {
        assert_eq!(sanitize_rel_path("Week 1/Slides: intro"), "Week 1/Slides_ intro");
        assert_eq!(sanitize_rel_path("a// . /b"), "a/b");
    }

    #[test]
    fn test_group_dir_name() {
        assert_eq!(group_dir_name(42, "Systems: Design"), "42_Systems_ Design");
    }
}
