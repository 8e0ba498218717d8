//! Issue tracker configuration

use serde::{Deserialize, Serialize};

/// Which backend to use and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Backend used when a request names none
    pub default_tool: String,

    /// Jira connection settings
    pub jira: JiraConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_tool: "jira".to_string(),
            jira: JiraConfig::default(),
        }
    }
}

/// Jira Cloud connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://example.atlassian.net`
    pub server_url: Option<String>,

    /// Account email used for basic auth
    pub email: Option<String>,

    /// API token used for basic auth
    pub api_token: Option<String>,

    /// Project issues are filed in
    pub project_key: String,

    /// Issue type name
    pub issue_type: String,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl JiraConfig {
    /// True when both a server URL and an API token are set
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.server_url) && set(&self.api_token)
    }
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            email: None,
            api_token: None,
            project_key: "KAN".to_string(),
            issue_type: "Task".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("server_url", &self.server_url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("project_key", &self.project_key)
            .field("issue_type", &self.issue_type)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
