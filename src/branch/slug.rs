//! Branch name to subdomain slug normalization.
//!
//! Slugs are lowercase `a-z0-9-` with collapsed separators and no leading or
//! trailing dash. Distinct branch names may produce the same slug
//! (`feature/A` and `feature-a`); callers that need uniqueness must check it.

/// Normalizes a branch name into a DNS-safe subdomain label.
///
/// `feature/DEV-001-say-hello` becomes `feature-dev-001-say-hello`. The result
/// is empty when the input has no ASCII alphanumerics; callers must reject an
/// empty slug before using it in a hostname.
#[must_use]
pub fn normalize(branch: &str) -> String {
    let mut slug = String::with_capacity(branch.len());
    let mut prev_dash = false;
    // `/` and every other character outside `[a-z0-9-]` map to `-`.
    for ch in branch.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalizes_feature_branch() {
        assert_eq!(
            normalize("feature/DEV-001-say-hello"),
            "feature-dev-001-say-hello"
        );
    }

    #[test]
    fn collapses_runs_and_replaces_symbols() {
        assert_eq!(normalize("add--new__line"), "add-new-line");
        assert_eq!(normalize("fix//double///slash"), "fix-double-slash");
    }

    #[test]
    fn strips_edges() {
        assert_eq!(normalize("/release/"), "release");
        assert_eq!(normalize("--main--"), "main");
    }

    #[test]
    fn plain_names_are_unchanged() {
        assert_eq!(normalize("main"), "main");
        assert_eq!(normalize("add-new-line"), "add-new-line");
    }

    #[test]
    fn empty_and_symbol_only_inputs_are_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "");
        assert_eq!(normalize("ñ"), "");
    }

    #[test]
    fn non_ascii_letters_become_separators() {
        assert_eq!(normalize("Café/Menü"), "caf-men");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "feature/DEV-001-say-hello",
            "add--new__line",
            "  spaced out  ",
            "UPPER/lower/123",
            "-_-",
            "release/v1.2.3",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn distinct_names_may_collide() {
        assert_eq!(normalize("feature/A"), normalize("feature-A"));
    }
}
