use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const APP_USER_AGENT: &str = "hackathon-judge";

/// GitHub content collaborator: README fetch and commit count.
///
/// Failure is reported in-band, matching the collaborator contracts:
/// `fetch_readme` returns an `"Error:"`-prefixed string and `count_commits`
/// returns `None`. The evidence assembler scrubs both before judging.
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Point the client at a different API base (used by tests)
    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the repository README as raw text, trying `README.md` then
    /// `README` in the repo root
    pub async fn fetch_readme(&self, repo_url: &str) -> String {
        let (owner, repo) = match parse_owner_repo(repo_url) {
            Some(parts) => parts,
            None => {
                return format!(
                    "Error: Invalid GitHub URL format: {repo_url}. Expected https://github.com/owner/repo"
                );
            }
        };

        for name in ["README.md", "README"] {
            let url = format!("{}/repos/{}/{}/contents/{}", self.api_base, owner, repo, name);
            let response = match self
                .http
                .get(&url)
                .header(ACCEPT, "application/vnd.github.v3.raw")
                .header(USER_AGENT, APP_USER_AGENT)
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    warn!(%url, %error, "README request failed");
                    return format!("Error: README request failed: {error}");
                }
            };

            let status = response.status();
            if status.is_success() {
                return match response.text().await {
                    Ok(text) => text,
                    Err(error) => format!("Error: Failed to read README body: {error}"),
                };
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                debug!(%name, "README variant not found, trying next");
                continue;
            }
            // Rate limiting and other API errors
            return format!("Error: Fetching README returned status {status}");
        }

        "Error: README file not found in the root directory.".to_string()
    }

    /// Count commits on the default branch via the commits API `Link`
    /// header. `None` on any failure.
    pub async fn count_commits(&self, repo_url: &str) -> Option<u64> {
        let (owner, repo) = parse_owner_repo(repo_url)?;
        let url = format!("{}/repos/{}/{}/commits?per_page=1", self.api_base, owner, repo);

        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, APP_USER_AGENT)
            .send()
            .await
            .map_err(|error| warn!(%url, %error, "Commit count request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Commit count request rejected");
            return None;
        }

        // With per_page=1 the rel="last" page number equals the commit count
        if let Some(link) = response.headers().get(reqwest::header::LINK) {
            if let Some(count) = link.to_str().ok().and_then(parse_last_page) {
                return Some(count);
            }
        }

        // No Link header: the whole history fits on one page
        let commits: Vec<serde_json::Value> = response.json().await.ok()?;
        Some(commits.len() as u64)
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract (owner, repo) from a GitHub repository URL
fn parse_owner_repo(repo_url: &str) -> Option<(String, String)> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))?;

    let mut parts = rest.split('/');
    let owner = parts.next()?;
    let repo = parts.next()?.trim_end_matches(".git");

    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Pull the page number out of a `Link` header's rel="last" entry
fn parse_last_page(link: &str) -> Option<u64> {
    for segment in link.split(',') {
        if !segment.contains("rel=\"last\"") {
            continue;
        }
        let url_part = segment.split(';').next()?.trim();
        let url = url_part.trim_start_matches('<').trim_end_matches('>');
        let query = url.split('?').nth(1)?;
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("page=") {
                return value.parse().ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_repo() {
        assert_eq!(
            parse_owner_repo("https://github.com/rust-lang/rust"),
            Some(("rust-lang".to_string(), "rust".to_string()))
        );
        assert_eq!(
            parse_owner_repo("https://github.com/a/b/"),
            Some(("a".to_string(), "b".to_string()))
        );
        assert_eq!(
            parse_owner_repo("https://github.com/a/b.git"),
            Some(("a".to_string(), "b".to_string()))
        );
        assert_eq!(parse_owner_repo("https://gitlab.com/a/b"), None);
        assert_eq!(parse_owner_repo("not a url"), None);
        assert_eq!(parse_owner_repo("https://github.com/onlyowner"), None);
    }

    #[test]
    fn test_parse_last_page() {
        let link = r#"<https://api.github.com/repos/a/b/commits?per_page=1&page=2>; rel="next", <https://api.github.com/repos/a/b/commits?per_page=1&page=347>; rel="last""#;
        assert_eq!(parse_last_page(link), Some(347));
    }

    #[test]
    fn test_parse_last_page_no_last_rel() {
        let link = r#"<https://api.github.com/repos/a/b/commits?page=2>; rel="next""#;
        assert_eq!(parse_last_page(link), None);
    }

    #[tokio::test]
    async fn test_fetch_readme_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/demo/proj/contents/README.md")
            .with_status(200)
            .with_body("# Demo\nHello")
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let readme = client.fetch_readme("https://github.com/demo/proj").await;

        assert_eq!(readme, "# Demo\nHello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_readme_falls_back_to_bare_readme() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/demo/proj/contents/README.md")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/demo/proj/contents/README")
            .with_status(200)
            .with_body("plain readme")
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let readme = client.fetch_readme("https://github.com/demo/proj").await;
        assert_eq!(readme, "plain readme");
    }

    #[tokio::test]
    async fn test_fetch_readme_not_found_returns_sentinel() {
        let mut server = mockito::Server::new_async().await;
        for name in ["README.md", "README"] {
            server
                .mock("GET", format!("/repos/demo/proj/contents/{name}").as_str())
                .with_status(404)
                .create_async()
                .await;
        }

        let client = GithubClient::with_api_base(&server.url());
        let readme = client.fetch_readme("https://github.com/demo/proj").await;
        assert!(readme.starts_with("Error:"));
        assert!(readme.contains("not found"));
    }

    #[tokio::test]
    async fn test_fetch_readme_api_error_returns_sentinel() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/demo/proj/contents/README.md")
            .with_status(403)
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let readme = client.fetch_readme("https://github.com/demo/proj").await;
        assert!(readme.starts_with("Error:"));
        assert!(readme.contains("403"));
    }

    #[tokio::test]
    async fn test_fetch_readme_invalid_url() {
        let client = GithubClient::with_api_base("http://127.0.0.1:1");
        let readme = client.fetch_readme("https://example.com/not/github").await;
        assert!(readme.starts_with("Error:"));
        assert!(readme.contains("Invalid GitHub URL"));
    }

    #[tokio::test]
    async fn test_count_commits_from_link_header() {
        let mut server = mockito::Server::new_async().await;
        let last = format!(
            "<{0}/repos/demo/proj/commits?per_page=1&page=2>; rel=\"next\", <{0}/repos/demo/proj/commits?per_page=1&page=42>; rel=\"last\"",
            server.url()
        );
        server
            .mock("GET", "/repos/demo/proj/commits?per_page=1")
            .with_status(200)
            .with_header("link", &last)
            .with_body("[{}]")
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let count = client.count_commits("https://github.com/demo/proj").await;
        assert_eq!(count, Some(42));
    }

    #[tokio::test]
    async fn test_count_commits_single_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/demo/proj/commits?per_page=1")
            .with_status(200)
            .with_body("[{}]")
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let count = client.count_commits("https://github.com/demo/proj").await;
        assert_eq!(count, Some(1));
    }

    #[tokio::test]
    async fn test_count_commits_api_error_returns_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/demo/proj/commits?per_page=1")
            .with_status(500)
            .create_async()
            .await;

        let client = GithubClient::with_api_base(&server.url());
        let count = client.count_commits("https://github.com/demo/proj").await;
        assert_eq!(count, None);
    }

    #[tokio::test]
    async fn test_count_commits_invalid_url_returns_none() {
        let client = GithubClient::with_api_base("http://127.0.0.1:1");
        assert_eq!(client.count_commits("garbage").await, None);
    }
}
