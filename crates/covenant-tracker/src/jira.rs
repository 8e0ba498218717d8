//! Jira Cloud backend
//!
//! Talks to the REST API v3 under `{server_url}/rest/api/3` with basic auth
//! (account email and API token). Descriptions travel as Atlassian Document
//! Format: one paragraph per line on the way out, flattened back to plain
//! text on the way in.
//!
//! Locking a description is best effort. Jira has no per-field lock, so the
//! backend posts a warning comment on the new issue and logs if that fails.

use crate::{JiraConfig, TrackerError};
use async_trait::async_trait;
use covenant_domain::traits::{IssueTracker, SearchableIssueTracker};
use covenant_domain::{Issue, IssueRequest, IssueUpdate};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const LOCK_NOTICE: &str =
    "IMPORTANT: This issue is linked to a legal obligation. The description should not be modified.";

const SEARCH_PAGE_SIZE: u32 = 50;

/// Jira Cloud issue tracker
pub struct JiraTracker {
    server_url: String,
    api_url: String,
    email: String,
    api_token: String,
    project_key: String,
    issue_type: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    #[serde(default)]
    fields: JiraFields,
}

#[derive(Deserialize, Default)]
struct JiraFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    priority: Option<Named>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    status: Option<Named>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct TransitionList {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Deserialize)]
struct Transition {
    id: String,
    to: Named,
}

impl JiraTracker {
    /// Create a tracker from connection settings
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` when the server URL or API token is
    /// missing, or the HTTP client cannot be built.
    pub fn new(config: &JiraConfig) -> Result<Self, TrackerError> {
        if !config.has_credentials() {
            return Err(TrackerError::Config(
                "Jira requires a server URL and an API token".to_string(),
            ));
        }

        let server_url = config
            .server_url
            .as_deref()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrackerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: format!("{}/rest/api/3", server_url),
            server_url,
            email: config.email.clone().unwrap_or_default(),
            api_token: config.api_token.clone().unwrap_or_default(),
            project_key: config.project_key.clone(),
            issue_type: config.issue_type.clone(),
            client,
        })
    }

    /// Base URL of the REST API
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.server_url, key)
    }

    fn create_body(&self, request: &IssueRequest) -> Value {
        let mut fields = json!({
            "project": { "key": self.project_key },
            "summary": request.title,
            "description": to_adf(&request.description),
            "issuetype": { "name": self.issue_type },
            "priority": { "name": request.priority.as_str() },
        });
        if !request.labels.is_empty() {
            fields["labels"] = json!(request.labels);
        }
        json!({ "fields": fields })
    }

    fn update_body(update: &IssueUpdate) -> Value {
        let mut fields = serde_json::Map::new();
        if let Some(title) = &update.title {
            fields.insert("summary".into(), json!(title));
        }
        if let Some(description) = &update.description {
            fields.insert("description".into(), to_adf(description));
        }
        if let Some(priority) = update.priority {
            fields.insert("priority".into(), json!({ "name": priority.as_str() }));
        }
        if let Some(labels) = &update.labels {
            fields.insert("labels".into(), json!(labels));
        }
        json!({ "fields": fields })
    }

    fn search_body(&self) -> Value {
        json!({
            "jql": format!("project = {} ORDER BY created DESC", self.project_key),
            "startAt": 0,
            "maxResults": SEARCH_PAGE_SIZE,
            "fields": ["summary", "description", "status", "priority", "labels"],
        })
    }

    fn issue_from(&self, raw: JiraIssue) -> Issue {
        Issue {
            url: Some(self.browse_url(&raw.key)),
            id: raw.id,
            key: raw.key,
            title: raw.fields.summary.unwrap_or_default(),
            description: raw
                .fields
                .description
                .as_ref()
                .map(adf_to_text)
                .unwrap_or_default(),
            priority: raw.fields.priority.map(|p| p.name),
            labels: raw.fields.labels,
            status: raw.fields.status.map(|s| s.name),
            description_locked: false,
        }
    }

    /// Send a request; `Ok(None)` means the resource does not exist
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<reqwest::Response>, TrackerError> {
        let url = format!("{}/{}", self.api_url, path);
        debug!(%method, %url, "Jira request");

        let mut builder = self
            .client
            .request(method, &url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrackerError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(Some(response))
    }

    async fn add_lock_comment(&self, key: &str) {
        let body = json!({
            "body": {
                "version": 1,
                "type": "doc",
                "content": [{
                    "type": "panel",
                    "attrs": { "panelType": "warning" },
                    "content": [{
                        "type": "paragraph",
                        "content": [{
                            "type": "text",
                            "text": LOCK_NOTICE,
                            "marks": [{ "type": "strong" }],
                        }],
                    }],
                }],
            }
        });

        match self
            .send(Method::POST, &format!("issue/{}/comment", key), Some(&body))
            .await
        {
            Ok(Some(_)) => debug!(key, "Added description lock notice"),
            Ok(None) => warn!(key, "Issue vanished before the lock notice was added"),
            Err(e) => warn!(key, error = %e, "Failed to add lock notice"),
        }
    }

    async fn transition(&self, id: &str, status: &str) -> Result<(), TrackerError> {
        let path = format!("issue/{}/transitions", id);
        let Some(response) = self.send(Method::GET, &path, None).await? else {
            return Ok(());
        };
        let list: TransitionList = response.json().await?;

        let Some(transition) = list
            .transitions
            .into_iter()
            .find(|t| t.to.name.eq_ignore_ascii_case(status))
        else {
            warn!(id, status, "No transition leads to the requested status");
            return Ok(());
        };

        let body = json!({ "transition": { "id": transition.id } });
        self.send(Method::POST, &path, Some(&body)).await?;
        Ok(())
    }
}

/// Wrap plain text in an Atlassian Document, one paragraph per line
fn to_adf(text: &str) -> Value {
    let content: Vec<Value> = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                json!({ "type": "paragraph", "content": [] })
            } else {
                json!({
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": line }],
                })
            }
        })
        .collect();
    json!({ "version": 1, "type": "doc", "content": content })
}

/// Flatten an Atlassian Document to text, one line per block
fn adf_to_text(doc: &Value) -> String {
    fn walk(node: &Value, out: &mut String) {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            out.push_str(text);
        }
        if let Some(children) = node.get("content").and_then(Value::as_array) {
            for child in children {
                walk(child, out);
            }
        }
        if matches!(
            node.get("type").and_then(Value::as_str),
            Some("paragraph" | "heading" | "hardBreak")
        ) {
            out.push('\n');
        }
    }

    if let Some(text) = doc.as_str() {
        return text.to_string();
    }
    let mut out = String::new();
    walk(doc, &mut out);
    out.trim_end_matches('\n').to_string()
}

#[async_trait]
impl IssueTracker for JiraTracker {
    type Error = TrackerError;

    fn name(&self) -> &str {
        "jira"
    }

    async fn create_issue(&self, request: &IssueRequest) -> Result<Issue, Self::Error> {
        let body = self.create_body(request);
        let response = self
            .send(Method::POST, "issue", Some(&body))
            .await?
            .ok_or_else(|| TrackerError::InvalidResponse("Issue endpoint not found".into()))?;
        let created: CreatedIssue = response.json().await?;

        info!(key = %created.key, title = %request.title, "Created Jira issue");

        if request.lock_description {
            self.add_lock_comment(&created.key).await;
        }

        Ok(Issue {
            url: Some(self.browse_url(&created.key)),
            id: created.id,
            key: created.key,
            title: request.title.clone(),
            description: request.description.clone(),
            priority: Some(request.priority.as_str().to_string()),
            labels: request.labels.clone(),
            status: None,
            description_locked: request.lock_description,
        })
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>, Self::Error> {
        let Some(response) = self
            .send(Method::GET, &format!("issue/{}", id), None)
            .await?
        else {
            return Ok(None);
        };
        let raw: JiraIssue = response.json().await?;
        Ok(Some(self.issue_from(raw)))
    }

    async fn update_issue(
        &self,
        id: &str,
        update: &IssueUpdate,
    ) -> Result<Option<Issue>, Self::Error> {
        let body = Self::update_body(update);
        let has_fields = body["fields"].as_object().is_some_and(|f| !f.is_empty());
        if has_fields
            && self
                .send(Method::PUT, &format!("issue/{}", id), Some(&body))
                .await?
                .is_none()
        {
            return Ok(None);
        }

        if let Some(status) = &update.status {
            self.transition(id, status).await?;
        }

        info!(id, "Updated Jira issue");
        self.get_issue(id).await
    }

    async fn delete_issue(&self, id: &str) -> Result<bool, Self::Error> {
        let deleted = self
            .send(Method::DELETE, &format!("issue/{}", id), None)
            .await?
            .is_some();
        if deleted {
            info!(id, "Deleted Jira issue");
        }
        Ok(deleted)
    }
}

#[async_trait]
impl SearchableIssueTracker for JiraTracker {
    async fn list_issues(&self) -> Result<Vec<Issue>, Self::Error> {
        let body = self.search_body();
        let Some(response) = self.send(Method::POST, "search", Some(&body)).await? else {
            return Ok(Vec::new());
        };
        let found: SearchResponse = response.json().await?;
        info!(count = found.issues.len(), "Retrieved Jira issues");
        Ok(found
            .issues
            .into_iter()
            .map(|raw| self.issue_from(raw))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::Priority;

    fn config(url: &str) -> JiraConfig {
        JiraConfig {
            server_url: Some(url.to_string()),
            email: Some("legal@example.com".into()),
            api_token: Some("token".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_credentials() {
        let result = JiraTracker::new(&JiraConfig::default());
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_api_url_trims_slash() {
        let tracker = JiraTracker::new(&config("https://example.atlassian.net/")).unwrap();
        assert_eq!(tracker.api_url(), "https://example.atlassian.net/rest/api/3");
        assert_eq!(
            tracker.browse_url("KAN-1"),
            "https://example.atlassian.net/browse/KAN-1"
        );
    }

    #[test]
    fn test_create_body_shape() {
        let tracker = JiraTracker::new(&config("https://example.atlassian.net")).unwrap();
        let mut request = IssueRequest::new("Legal Obligation: Pay", "line one\nline two");
        request.priority = Priority::High;
        request.labels = vec!["legal-obligation".into()];

        let body = tracker.create_body(&request);
        let fields = &body["fields"];
        assert_eq!(fields["project"]["key"], "KAN");
        assert_eq!(fields["issuetype"]["name"], "Task");
        assert_eq!(fields["summary"], "Legal Obligation: Pay");
        assert_eq!(fields["priority"]["name"], "High");
        assert_eq!(fields["labels"][0], "legal-obligation");
        assert_eq!(fields["description"]["type"], "doc");
        assert_eq!(
            fields["description"]["content"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_update_body_only_set_fields() {
        let update = IssueUpdate {
            title: Some("New".into()),
            status: Some("Done".into()),
            ..Default::default()
        };
        let body = JiraTracker::update_body(&update);
        let fields = body["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["summary"], "New");
    }

    #[test]
    fn test_search_body_scopes_project() {
        let tracker = JiraTracker::new(&config("https://example.atlassian.net")).unwrap();
        let body = tracker.search_body();
        assert!(body["jql"].as_str().unwrap().starts_with("project = KAN"));
        assert_eq!(body["maxResults"], 50);
    }

    #[test]
    fn test_adf_round_trip_text() {
        let text = "## Legal Obligation Details\n\n**Responsible Party:** Buyer";
        assert_eq!(adf_to_text(&to_adf(text)), text);
    }

    #[test]
    fn test_issue_from_maps_fields() {
        let tracker = JiraTracker::new(&config("https://example.atlassian.net")).unwrap();
        let raw: JiraIssue = serde_json::from_value(json!({
            "id": "10001",
            "key": "KAN-7",
            "fields": {
                "summary": "Legal Obligation: Pay",
                "description": null,
                "priority": { "name": "Low" },
                "labels": ["legal-obligation"],
                "status": { "name": "In Progress" }
            }
        }))
        .unwrap();

        let issue = tracker.issue_from(raw);
        assert_eq!(issue.key, "KAN-7");
        assert_eq!(issue.description, "");
        assert_eq!(issue.priority.as_deref(), Some("Low"));
        assert_eq!(issue.status.as_deref(), Some("In Progress"));
        assert_eq!(
            issue.url.as_deref(),
            Some("https://example.atlassian.net/browse/KAN-7")
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_communication_error() {
        let tracker = JiraTracker::new(&config("http://127.0.0.1:1")).unwrap();
        let result = tracker.get_issue("KAN-1").await;
        assert!(matches!(result, Err(TrackerError::Communication(_))));
    }
}
