use serde::Deserialize;

use crate::api::{json_body, parse_id, require_text};
use crate::error::{ApiError, ApiResult};
use crate::http::response::{Response, StatusCode};
use crate::router::Context;
use crate::store::{IssueState, IssueUpdate, NewIssue};

#[derive(Debug, Deserialize)]
struct CreateIssue {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateIssue {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// Resolves `{name}` to an existing repository.
fn repo<'a>(ctx: &'a Context<'_>) -> ApiResult<&'a str> {
    let name = ctx.param("name")?;
    ctx.state.repos.repository(name)?;
    Ok(name)
}

/// `GET /api/repo/{name}/issues`
pub fn list_issues(ctx: &Context<'_>) -> ApiResult<Response> {
    let issues = ctx.state.records.issues(repo(ctx)?)?;
    Ok(Response::json(StatusCode::Ok, &issues)?)
}

/// `POST /api/repo/{name}/issues`
pub fn create_issue(ctx: &Context<'_>) -> ApiResult<Response> {
    let repo = repo(ctx)?;
    let author = ctx.username()?;
    let body: CreateIssue = json_body(ctx.request)?;
    require_text(&body.title, "title")?;

    let issue = ctx.state.records.create_issue(
        repo,
        NewIssue {
            title: body.title,
            body: body.body.unwrap_or_default(),
            author: author.to_string(),
        },
    )?;

    tracing::info!(repo = repo, issue = issue.id, author = author, "Issue opened");
    Ok(Response::json(StatusCode::Created, &issue)?)
}

/// `GET /api/repo/{name}/issues/{id}`
pub fn get_issue(ctx: &Context<'_>) -> ApiResult<Response> {
    let repo = repo(ctx)?;
    let id = parse_id(ctx.param("id")?, "issue")?;
    let issue = ctx.state.records.issue(repo, id)?;
    Ok(Response::json(StatusCode::Ok, &issue)?)
}

/// `PUT|PATCH /api/repo/{name}/issues/{id}`. Absent fields are left unchanged.
pub fn update_issue(ctx: &Context<'_>) -> ApiResult<Response> {
    let repo = repo(ctx)?;
    let id = parse_id(ctx.param("id")?, "issue")?;
    let body: UpdateIssue = json_body(ctx.request)?;

    if let Some(title) = &body.title {
        require_text(title, "title")?;
    }
    let state = body
        .state
        .as_deref()
        .map(|s| {
            IssueState::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid issue state '{s}'")))
        })
        .transpose()?;

    let issue = ctx.state.records.update_issue(
        repo,
        id,
        IssueUpdate {
            title: body.title,
            body: body.body,
            state,
        },
    )?;
    Ok(Response::json(StatusCode::Ok, &issue)?)
}
