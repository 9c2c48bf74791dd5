//! Forge HTTP API: the route table and its handlers.
//!
//! Every `/api/` route except login and logout requires a valid session
//! cookie. Request bodies are small JSON objects whose fields are all
//! strings; anything else is rejected with `400`.

pub mod auth;
pub mod issues;
pub mod pulls;
pub mod repos;
pub mod static_files;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::http::request::Method;
use crate::http::request::Request;
use crate::router::{RouteError, Router};

const MAX_NAME_LEN: usize = 100;

/// Registers the full route table, in match order.
pub fn register(router: &mut Router) -> Result<(), RouteError> {
    use Method::{GET, PATCH, POST, PUT};

    router
        .route(POST, "/api/login", false, auth::login)?
        .route(POST, "/api/logout", false, auth::logout)?
        .route(GET, "/api/repos", true, repos::list_repositories)?
        .route(POST, "/api/repos", true, repos::create_repository)?
        .route(GET, "/api/repo/{name}", true, repos::get_repository)?
        .route(GET, "/api/repo/{name}/branches", true, repos::list_branches)?
        .route(POST, "/api/repo/{name}/branches", true, repos::create_branch)?
        .route(GET, "/api/repo/{name}/commits/{branch}", true, repos::list_commits)?
        .route(GET, "/api/repo/{name}/tree/{branch}", true, repos::tree)?
        .route(GET, "/api/repo/{name}/tree/{branch}/{path}", true, repos::tree)?
        .route(GET, "/api/repo/{name}/blob/{branch}/{path}", true, repos::blob)?
        .route(GET, "/api/repo/{name}/issues", true, issues::list_issues)?
        .route(POST, "/api/repo/{name}/issues", true, issues::create_issue)?
        .route(GET, "/api/repo/{name}/issues/{id}", true, issues::get_issue)?
        .route(PUT, "/api/repo/{name}/issues/{id}", true, issues::update_issue)?
        .route(PATCH, "/api/repo/{name}/issues/{id}", true, issues::update_issue)?
        .route(GET, "/api/repo/{name}/pulls", true, pulls::list_pulls)?
        .route(POST, "/api/repo/{name}/pulls", true, pulls::create_pull)?
        .route(GET, "/api/repo/{name}/pulls/{id}", true, pulls::get_pull)?
        .route(PUT, "/api/repo/{name}/pulls/{id}", true, pulls::update_pull)?
        .route(PATCH, "/api/repo/{name}/pulls/{id}", true, pulls::update_pull)?
        .route(PUT, "/api/repo/{name}/pulls/{id}/merge", true, pulls::merge_pull)?
        .route(PUT, "/api/repo/{name}/pulls/{id}/close", true, pulls::close_pull)?
        .route(PUT, "/api/repo/{name}/pulls/{id}/delete-branch", true, pulls::delete_branch)?;

    router.set_fallback(static_files::serve);
    Ok(())
}

/// Decodes the request body as a JSON object of type `T`.
pub(crate) fn json_body<T: DeserializeOwned>(request: &Request) -> ApiResult<T> {
    let body = request
        .body
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Request body is required"))?;
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

/// Percent-decodes a path parameter that names a file inside a repository.
pub(crate) fn decode_path(raw: &str) -> ApiResult<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ApiError::bad_request("Path is not valid UTF-8"))
}

/// Repository and branch names: 1-100 of `[A-Za-z0-9._-]`, not starting with `.`.
pub(crate) fn validate_name(name: &str, what: &str) -> ApiResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Invalid {what} name '{name}'")))
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<u64> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {what} id '{raw}'")))
}

/// Rejects a title that is present but blank.
pub(crate) fn require_text(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("'{field}' must not be empty")));
    }
    Ok(())
}
