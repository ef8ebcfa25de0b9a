//! GitHub Contents API store.
//!
//! The list is a file in a repository. Reads return the blob SHA, which the
//! API demands back on update; a mismatching SHA is answered with 409.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{GithubStoreConfig, PostingList, VersionToken};
use crate::storage::ListStore;
use crate::utils::http::create_api_client;

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const USER_AGENT: &str = concat!("contest-watch/", env!("CARGO_PKG_VERSION"));

/// `GET /repos/{owner}/{repo}/contents/{path}` response (file case).
///
/// Files over 1 MB come back with empty `content` and `encoding: "none"`.
#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    size: u64,
}

/// How a response status maps onto the store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    NotFound,
    Conflict,
    Failed,
}

fn classify_get(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else {
        StatusClass::Failed
    }
}

/// `creating` is a PUT without a sha; 422 then means the file already exists.
fn classify_put(status: StatusCode, creating: bool) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::CONFLICT
        || status == StatusCode::PRECONDITION_FAILED
        || (creating && status == StatusCode::UNPROCESSABLE_ENTITY)
    {
        StatusClass::Conflict
    } else {
        StatusClass::Failed
    }
}

/// `PUT /repos/{owner}/{repo}/contents/{path}` body.
#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
    #[serde(default)]
    path: String,
}

/// List stored as a file in a GitHub repository.
pub struct GithubStore {
    config: GithubStoreConfig,
    client: Client,
}

impl GithubStore {
    pub fn new(config: &GithubStoreConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: create_api_client(USER_AGENT, 25)?,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.path.trim_start_matches('/')
        )
    }

    fn branch(&self) -> Option<&str> {
        Some(self.config.branch.as_str()).filter(|b| !b.is_empty())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorize_as(request, JSON_MEDIA_TYPE)
    }

    fn authorize_as(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        let request = request
            .header(reqwest::header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION);
        if self.config.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.config.token)
        }
    }

    fn get_request(&self, accept: &str) -> RequestBuilder {
        let request = self.authorize_as(self.client.get(self.api_url()), accept);
        match self.branch() {
            Some(branch) => request.query(&[("ref", branch)]),
            None => request,
        }
    }

    /// Send a GET and map its status.
    async fn get(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        match classify_get(status) {
            StatusClass::Success => Ok(response),
            StatusClass::NotFound => Err(AppError::NotInitialized {
                location: self.location(),
            }),
            StatusClass::Conflict | StatusClass::Failed => {
                let text = response.text().await.unwrap_or_default();
                Err(AppError::store(self.location(), format!("GET {status}: {text}")))
            }
        }
    }

    /// File bytes through the raw media type, for files too large to inline.
    async fn fetch_raw(&self) -> Result<Vec<u8>> {
        let request = self.get_request(RAW_MEDIA_TYPE);
        Ok(self.get(request).await?.bytes().await?.to_vec())
    }

    async fn put(&self, list: &PostingList, sha: Option<&str>, message: &str) -> Result<VersionToken> {
        let body = PutContent {
            message,
            content: encode_content(&list.to_json_pretty()?),
            sha,
            branch: self.branch(),
        };

        let response = self
            .authorize(self.client.put(self.api_url()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match classify_put(status, sha.is_none()) {
            StatusClass::Success => {}
            StatusClass::Conflict => {
                return Err(AppError::Conflict {
                    location: self.location(),
                });
            }
            StatusClass::NotFound | StatusClass::Failed => {
                let text = response.text().await.unwrap_or_default();
                return Err(AppError::store(self.location(), format!("PUT {status}: {text}")));
            }
        }

        let saved: PutResponse = response.json().await?;
        log::info!("GitHub saved {} sha={}", saved.content.path, saved.content.sha);
        Ok(VersionToken::new(saved.content.sha))
    }
}

#[async_trait]
impl ListStore for GithubStore {
    async fn read(&self) -> Result<(VersionToken, PostingList)> {
        let request = self.get_request(JSON_MEDIA_TYPE);
        let file: ContentFile = self.get(request).await?.json().await?;
        let bytes = match inline_content(&file, &self.location())? {
            Some(bytes) => bytes,
            None => {
                log::debug!("{} is {} bytes; fetching raw", self.location(), file.size);
                self.fetch_raw().await?
            }
        };
        ensure_complete(&bytes, file.size, &self.location())?;

        let list = PostingList::from_json_slice(&bytes)?;
        Ok((VersionToken::new(file.sha), list))
    }

    async fn write(
        &self,
        list: &PostingList,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        self.put(list, Some(expected.as_str()), message).await
    }

    async fn init(&self) -> Result<VersionToken> {
        self.put(&PostingList::default(), None, "chore: initialize posting list")
            .await
    }

    fn location(&self) -> String {
        let branch = self.branch().map(|b| format!("@{b}")).unwrap_or_default();
        format!(
            "github:{}/{}/{}{}",
            self.config.owner, self.config.repo, self.config.path, branch
        )
    }
}

/// Decode the API's base64 payload, which arrives wrapped at 60 columns.
fn decode_content(content: &str) -> Result<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Inline bytes of `file`, or `None` when the API left them out.
fn inline_content(file: &ContentFile, location: &str) -> Result<Option<Vec<u8>>> {
    match file.encoding.as_str() {
        "none" => Ok(None),
        _ if file.content.trim().is_empty() && file.size > 0 => Ok(None),
        "" | "base64" => Ok(Some(decode_content(&file.content)?)),
        other => Err(AppError::store(
            location,
            format!("unsupported content encoding '{other}'"),
        )),
    }
}

/// Refuse bytes that do not add up to the size the API reported.
fn ensure_complete(bytes: &[u8], size: u64, location: &str) -> Result<()> {
    if size > 0 && bytes.len() as u64 != size {
        return Err(AppError::store(
            location,
            format!("got {} bytes, expected {}", bytes.len(), size),
        ));
    }
    Ok(())
}

fn encode_content(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
