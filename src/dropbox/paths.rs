/// Dropbox path helpers

use regex::Regex;
use std::sync::OnceLock;

fn repeated_slashes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/{2,}").expect("valid slash regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Leading `/`, no repeated or trailing slashes; blank is the root
pub fn norm_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let rooted = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    let mut collapsed = repeated_slashes().replace_all(&rooted, "/").into_owned();
    if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }
    collapsed
}

/// Make a string safe as a single path component
pub fn sanitize_component(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\0' { ' ' } else { c })
        .collect();
    let collapsed = whitespace_runs().replace_all(&replaced, " ");
    let cleaned = collapsed.trim().trim_end_matches([' ', '.']);
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

/// "Patrick Gill" -> "P"; blank -> "U"
pub fn client_initial(client_name: &str) -> String {
    let Some(first) = client_name.trim().chars().next() else {
        return "U".to_string();
    };
    let upper: String = first.to_uppercase().collect();
    let initial: String = sanitize_component(&upper).chars().take(1).collect();
    if initial.is_empty() {
        "U".to_string()
    } else {
        initial
    }
}

/// `<root>/Client Documents/<Initial>/<Client>/<Year>/MCSS/<Address>/EOB_Proposal_Payment`
pub fn build_target_folder(root: &str, client_name: &str, year: &str, address: &str) -> String {
    norm_path(&format!(
        "{}/Client Documents/{}/{}/{}/MCSS/{}/EOB_Proposal_Payment",
        norm_path(root),
        client_initial(client_name),
        sanitize_component(client_name),
        sanitize_component(year),
        sanitize_component(address),
    ))
}

/// True when `path` is the root itself or below it
pub fn is_within_root(path: &str, root: &str) -> bool {
    let path = norm_path(path);
    let root = norm_path(root);
    if root == "/" {
        return true;
    }
    path == root || path.starts_with(&format!("{root}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_path() {
        assert_eq!(norm_path(""), "/");
        assert_eq!(norm_path("  "), "/");
        assert_eq!(norm_path("a//b/"), "/a/b");
        assert_eq!(norm_path("/"), "/");
        assert_eq!(norm_path("///x"), "/x");
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("  12 Elm St. "), "12 Elm St");
        assert_eq!(sanitize_component("A/B\0C"), "A B C");
        assert_eq!(sanitize_component("a \t  b"), "a b");
        assert_eq!(sanitize_component("..."), "Unknown");
        assert_eq!(sanitize_component(""), "Unknown");
    }

    #[test]
    fn test_client_initial() {
        assert_eq!(client_initial("patrick Gill"), "P");
        assert_eq!(client_initial("   "), "U");
        assert_eq!(client_initial("/slash"), "U");
    }

    #[test]
    fn test_build_target_folder() {
        assert_eq!(
            build_target_folder(
                "/CostSeg Team Folder/Mark/Test Client Master/",
                "Jane Doe",
                "2025",
                "12 Elm St., Springfield"
            ),
            "/CostSeg Team Folder/Mark/Test Client Master/Client Documents/J/Jane Doe/2025/MCSS/12 Elm St., Springfield/EOB_Proposal_Payment"
        );
        assert_eq!(
            build_target_folder("", "", "", ""),
            "/Client Documents/U/Unknown/Unknown/MCSS/Unknown/EOB_Proposal_Payment"
        );
    }

    #[test]
    fn test_is_within_root() {
        assert!(is_within_root("/Root/a", "/Root"));
        assert!(is_within_root("/Root", "/Root/"));
        assert!(!is_within_root("/RootOther/a", "/Root"));
        assert!(!is_within_root("/Else", "/Root"));
        assert!(is_within_root("/anything", "/"));
    }
}
