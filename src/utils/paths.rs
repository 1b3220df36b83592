// Object key normalization

/// Strip a leading `{base_url}/` and then one leading slash, so fully
/// qualified URLs and `/`-rooted paths map to the same bare key.
pub fn normalize_key<'a>(path: &'a str, base_url: &str) -> &'a str {
    let path = path
        .strip_prefix(base_url)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path);
    path.strip_prefix('/').unwrap_or(path)
}

/// Treat empty strings like missing values.
pub fn present(path: Option<&str>) -> Option<&str> {
    path.filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://bkt.s3.amazonaws.com";

    #[test]
    fn test_strips_base_url_and_slash() {
        assert_eq!(normalize_key("https://bkt.s3.amazonaws.com/a/b.txt", BASE), "a/b.txt");
        assert_eq!(normalize_key("/a/b.txt", BASE), "a/b.txt");
        assert_eq!(normalize_key("a/b.txt", BASE), "a/b.txt");
    }

    #[test]
    fn test_prefix_stripping_is_idempotent() {
        for path in ["test.txt", "/test.txt", "nested/dir/file.pdf", "/x"] {
            let qualified = format!("{}/{}", BASE, path);
            assert_eq!(normalize_key(&qualified, BASE), normalize_key(path, BASE));
        }
    }

    #[test]
    fn test_only_one_leading_slash_and_exact_prefix() {
        assert_eq!(normalize_key("//double", BASE), "/double");
        // Another bucket's URL is left alone apart from nothing to strip
        assert_eq!(
            normalize_key("https://other.s3.amazonaws.com/a.txt", BASE),
            "https://other.s3.amazonaws.com/a.txt"
        );
        // Base URL without a separating slash is not a prefix match
        assert_eq!(
            normalize_key("https://bkt.s3.amazonaws.comx/a.txt", BASE),
            "https://bkt.s3.amazonaws.comx/a.txt"
        );
    }

    #[test]
    fn test_present() {
        assert_eq!(present(Some("a")), Some("a"));
        assert_eq!(present(Some("")), None);
        assert_eq!(present(None), None);
    }
}
