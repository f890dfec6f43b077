use crate::error::{CiError, Result};
use crate::github::{CommitStatus, GitHubApi, IssueComment, Repo, COMMENTS_PER_PAGE};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

const API_VERSION: &str = "2022-11-28";

/// Blocking GitHub REST client bound to one repository
pub struct GitHubClient {
    http: Client,
    api_url: String,
    repo: Repo,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

#[derive(Deserialize)]
struct PullRequest {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: RefObject,
}

impl GitHubClient {
    pub fn new(api_url: &str, repo: Repo, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| CiError::config("Invalid GitHub token"))?;
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(format!("gha-ci/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubClient {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.repo.owner, self.repo.name, path
        )
    }

    /// Send a request, turning non-success statuses into [CiError::GitHub].
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(extract_error(response))
    }

    /// Like [Self::send], but a 404 is `None`.
    fn send_optional(&self, request: RequestBuilder) -> Result<Option<Response>> {
        match self.send(request) {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn extract_error(response: Response) -> CiError {
    let status = response.status();
    let message = match response.json::<ErrorBody>() {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    CiError::GitHub {
        status: status.as_u16(),
        message,
    }
}

impl GitHubApi for GitHubClient {
    fn pull_request_labels(&self, pull_number: u64) -> Result<Vec<String>> {
        let url = self.url(&format!("pulls/{}", pull_number));
        let pr: PullRequest = self.send(self.http.get(url))?.json()?;
        Ok(pr.labels.into_iter().map(|l| l.name).collect())
    }

    fn issue_comments(&self, issue_number: u64, page: u32) -> Result<Vec<IssueComment>> {
        let url = self.url(&format!("issues/{}/comments", issue_number));
        let request = self.http.get(url).query(&[
            ("per_page", COMMENTS_PER_PAGE.to_string()),
            ("page", page.to_string()),
        ]);
        Ok(self.send(request)?.json()?)
    }

    fn create_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        let url = self.url(&format!("issues/{}/comments", issue_number));
        self.send(self.http.post(url).json(&json!({ "body": body })))?;
        Ok(())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        let url = self.url(&format!("issues/comments/{}", comment_id));
        self.send(self.http.patch(url).json(&json!({ "body": body })))?;
        Ok(())
    }

    fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        tracing::info!(sha, context = %status.context, state = %status.state, "setting commit status");
        let url = self.url(&format!("statuses/{}", sha));
        self.send(self.http.post(url).json(status))?;
        Ok(())
    }

    fn dispatch_workflow(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        tracing::info!(workflow = workflow_file, git_ref, "dispatching workflow");
        let url = self.url(&format!("actions/workflows/{}/dispatches", workflow_file));
        let body = json!({ "ref": git_ref, "inputs": inputs });
        self.send(self.http.post(url).json(&body))?;
        Ok(())
    }

    fn get_ref(&self, git_ref: &str) -> Result<Option<String>> {
        let url = self.url(&format!("git/ref/{}", git_ref));
        match self.send_optional(self.http.get(url))? {
            Some(response) => {
                let found: GitRef = response.json()?;
                Ok(Some(found.object.sha))
            }
            None => Ok(None),
        }
    }

    fn delete_ref(&self, git_ref: &str) -> Result<()> {
        let url = self.url(&format!("git/refs/{}", git_ref));
        self.send(self.http.delete(url))?;
        Ok(())
    }

    fn file_exists(&self, path: &str, git_ref: &str) -> Result<bool> {
        let url = self.url(&format!("contents/{}", path));
        let request = self.http.get(url).query(&[("ref", git_ref)]);
        Ok(self.send_optional(request)?.is_some())
    }
}
