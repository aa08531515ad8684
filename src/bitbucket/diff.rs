use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use super::pulls::build_url;
use super::{check_status_code, AccessToken, BitbucketClient, BitbucketError, DiffResult, QueryParams};
use crate::http::{BearerAuth, Sleeper, Transport};

/// File headers look like `diff --git a/{path} b/{path}`.
static FILE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"diff --git a/(.*?) b").expect("file header pattern is valid")
});

/// Paths named in the `diff --git` headers of `diff`, in order of
/// appearance. Duplicates are kept.
///
/// Paths containing ` b` are cut short; only the header line is examined.
pub fn extract_diff_files(diff: &str) -> Vec<String> {
    FILE_HEADER
        .captures_iter(diff)
        .filter_map(|captures| captures.get(1))
        .map(|path| path.as_str().to_string())
        .collect()
}

/// Decode a diff body and list its files.
///
/// A non-empty body without a single recognised file header means the diff
/// format changed under us; that is reported as
/// [`BitbucketError::UnrecognisedDiffFormat`] rather than an empty list.
pub fn parse_diff_body(body: Vec<u8>) -> Result<DiffResult, BitbucketError> {
    let text = String::from_utf8(body)?;
    let files = extract_diff_files(&text);
    if !text.is_empty() && files.is_empty() {
        return Err(BitbucketError::UnrecognisedDiffFormat);
    }
    Ok(DiffResult { text, files })
}

impl<T: Transport, S: Sleeper> BitbucketClient<T, S> {
    /// Fetch the unified diff of a pull request.
    #[instrument(skip(self, token))]
    pub fn get_diff(
        &self,
        project: &str,
        repo: &str,
        token: &AccessToken,
        pr_number: &str,
    ) -> Result<DiffResult, BitbucketError> {
        let url = build_url(
            &self.endpoints.api_base,
            &[project, repo, "pullrequests", pr_number, "diff"],
            &QueryParams::new(),
        )?;

        info!("getting diff");
        let response = self.get_with_retry(&url, &BearerAuth::new(token.as_str()))?;
        check_status_code(&response)?;
        debug!(
            content_type = response.header("Content-Type").unwrap_or("unknown"),
            bytes = response.body.len(),
            "received diff"
        );

        let diff = parse_diff_body(response.body)?;
        debug!(files = diff.files.len(), "parsed diff");
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::test_support::test_client;
    use crate::http::HttpResponse;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,5 +1,7 @@
 fn main() {
-    println!("old");
+    println!("new");
 }
diff --git a/new_file.txt b/new_file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new_file.txt
@@ -0,0 +1,2 @@
+hello
+world
"#;

    #[test]
    fn test_extracts_files_in_order() {
        let files =
            extract_diff_files("diff --git a/foo.py b/foo.py\n...diff --git a/bar.py b/bar.py\n...");
        assert_eq!(files, vec!["foo.py", "bar.py"]);
    }

    #[test]
    fn test_extracts_nested_paths() {
        let files = extract_diff_files(SAMPLE_DIFF);
        assert_eq!(files, vec!["src/main.rs", "new_file.txt"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let diff = "diff --git a/a.rs b/a.rs\n+x\ndiff --git a/a.rs b/a.rs\n+y\n";
        assert_eq!(extract_diff_files(diff), vec!["a.rs", "a.rs"]);
    }

    #[test]
    fn test_empty_body_is_fine() {
        let diff = parse_diff_body(Vec::new()).unwrap();
        assert!(diff.text.is_empty());
        assert!(diff.files.is_empty());
    }

    #[test]
    fn test_unrecognised_format_fails() {
        let err = parse_diff_body(b"Index: foo.py\n===\n+line\n".to_vec()).unwrap_err();
        assert!(matches!(err, BitbucketError::UnrecognisedDiffFormat));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let err = parse_diff_body(vec![0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, BitbucketError::Utf8(_)));
    }

    #[test]
    fn test_get_diff_fetches_diff_endpoint() {
        let client = test_client([
            HttpResponse::new(200, SAMPLE_DIFF).with_header("Content-Type", "text/plain")
        ]);
        let diff = client
            .get_diff("P", "R", &AccessToken::new("tok"), "7")
            .unwrap();

        assert_eq!(diff.text, SAMPLE_DIFF);
        assert_eq!(diff.files, vec!["src/main.rs", "new_file.txt"]);
        let requests = client.transport().requests();
        assert_eq!(
            requests[0].url,
            "https://api.bitbucket.org/2.0/repositories/P/R/pullrequests/7/diff"
        );
        assert_eq!(requests[0].header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_get_diff_encodes_path_segments() {
        let client = test_client([HttpResponse::new(200, "")]);
        client
            .get_diff("my team", "R#1", &AccessToken::new("tok"), "7")
            .unwrap();
        assert_eq!(
            client.transport().urls(),
            vec!["https://api.bitbucket.org/2.0/repositories/my%20team/R%231/pullrequests/7/diff"]
        );
    }

    #[test]
    fn test_get_diff_retries_then_validates() {
        let client = test_client([
            HttpResponse::new(555, ""),
            HttpResponse::new(404, "gone"),
        ]);
        let err = client
            .get_diff("P", "R", &AccessToken::new("tok"), "7")
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404 Not Found - Does the repo supplied exist?");
        assert_eq!(client.transport().requests().len(), 2);
    }

    #[test]
    fn test_get_diff_rejects_unrecognised_body() {
        let client = test_client([HttpResponse::new(200, "not a diff")]);
        let err = client
            .get_diff("P", "R", &AccessToken::new("tok"), "7")
            .unwrap_err();
        assert!(matches!(err, BitbucketError::UnrecognisedDiffFormat));
    }
}
