use std::time::Duration;

use crate::error::{AppError, AppResult};

use super::types::{DirectoryReply, PAGE_LIMIT, RosterPage};

/// Paged "list members matching a query" capability.
///
/// The transport is injected so the fetch worker and tests never depend
/// on a live endpoint.
pub trait DirectoryClient: Send + Sync {
    fn list(&self, page: usize, search: &str) -> AppResult<RosterPage>;
}

pub struct HttpDirectoryClient {
    endpoint: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpDirectoryClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            token,
            agent,
        }
    }
}

impl DirectoryClient for HttpDirectoryClient {
    fn list(&self, page: usize, search: &str) -> AppResult<RosterPage> {
        let mut request = self
            .agent
            .get(&self.endpoint)
            .query("page", &page.to_string())
            .query("limit", &PAGE_LIMIT.to_string());
        if !search.is_empty() {
            request = request.query("search", search);
        }
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = request
            .call()
            .map_err(|source| AppError::transport(format!("page {page} request"), source))?;
        let reply: DirectoryReply = response
            .into_json()
            .map_err(|source| AppError::io_with_context(source, format!("page {page} body")))?;

        if !reply.success {
            return Err(AppError::unsupported(format!(
                "directory reported failure for page {page}"
            )));
        }

        Ok(RosterPage {
            members: reply.data,
            page: reply.pagination.page,
            total_pages: reply.pagination.total_pages,
        })
    }
}
