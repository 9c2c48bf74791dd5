use serde::Deserialize;
use serde_json::json;

use crate::api::{json_body, parse_id, require_text, validate_name};
use crate::error::{ApiError, ApiResult};
use crate::http::response::{Response, StatusCode};
use crate::router::Context;
use crate::store::{NewPullRequest, PullRequest, PullState, PullUpdate, StoreError};

#[derive(Debug, Deserialize)]
struct CreatePull {
    title: String,
    #[serde(default)]
    body: Option<String>,
    head: String,
    base: String,
}

#[derive(Debug, Deserialize)]
struct UpdatePull {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

fn repo<'a>(ctx: &'a Context<'_>) -> ApiResult<&'a str> {
    let name = ctx.param("name")?;
    ctx.state.repos.repository(name)?;
    Ok(name)
}

fn load<'a>(ctx: &'a Context<'_>) -> ApiResult<(&'a str, PullRequest)> {
    let repo = repo(ctx)?;
    let id = parse_id(ctx.param("id")?, "pull request")?;
    let pull = ctx.state.records.pull(repo, id)?;
    Ok((repo, pull))
}

/// `GET /api/repo/{name}/pulls`
pub fn list_pulls(ctx: &Context<'_>) -> ApiResult<Response> {
    let pulls = ctx.state.records.pulls(repo(ctx)?)?;
    Ok(Response::json(StatusCode::Ok, &pulls)?)
}

/// `POST /api/repo/{name}/pulls`
pub fn create_pull(ctx: &Context<'_>) -> ApiResult<Response> {
    let repo = repo(ctx)?;
    let author = ctx.username()?;
    let body: CreatePull = json_body(ctx.request)?;
    require_text(&body.title, "title")?;
    validate_name(&body.head, "branch")?;
    validate_name(&body.base, "branch")?;
    if body.head == body.base {
        return Err(ApiError::bad_request("head and base must be different branches"));
    }

    let branches = ctx.state.repos.branches(repo)?;
    for wanted in [&body.head, &body.base] {
        if !branches.iter().any(|b| &b.name == wanted) {
            return Err(ApiError::bad_request(format!("Unknown branch '{wanted}'")));
        }
    }

    let pull = ctx.state.records.create_pull(
        repo,
        NewPullRequest {
            title: body.title,
            body: body.body.unwrap_or_default(),
            head: body.head,
            base: body.base,
            author: author.to_string(),
        },
    )?;

    tracing::info!(repo = repo, pull = pull.id, head = %pull.head, base = %pull.base, "Pull request opened");
    Ok(Response::json(StatusCode::Created, &pull)?)
}

/// `GET /api/repo/{name}/pulls/{id}`
pub fn get_pull(ctx: &Context<'_>) -> ApiResult<Response> {
    let (_, pull) = load(ctx)?;
    Ok(Response::json(StatusCode::Ok, &pull)?)
}

/// `PUT|PATCH /api/repo/{name}/pulls/{id}`. Only title and body are editable;
/// state changes go through merge/close.
pub fn update_pull(ctx: &Context<'_>) -> ApiResult<Response> {
    let (repo, pull) = load(ctx)?;
    let body: UpdatePull = json_body(ctx.request)?;
    if let Some(title) = &body.title {
        require_text(title, "title")?;
    }

    let updated = ctx.state.records.update_pull(
        repo,
        pull.id,
        PullUpdate {
            title: body.title,
            body: body.body,
            ..PullUpdate::default()
        },
    )?;
    Ok(Response::json(StatusCode::Ok, &updated)?)
}

/// `PUT /api/repo/{name}/pulls/{id}/merge`
///
/// The pull request is claimed as merged before the merge runs, so only one
/// of several concurrent merges gets through. A failed merge reopens it.
pub fn merge_pull(ctx: &Context<'_>) -> ApiResult<Response> {
    let (repo, pull) = load(ctx)?;
    let user = ctx.username()?;

    claim(ctx, repo, pull.id, PullState::Merged)?;
    let commit = match ctx.state.repos.merge(repo, &pull.head, &pull.base, user) {
        Ok(commit) => commit,
        Err(e) => {
            if let Err(rollback) = ctx.state.records.transition_pull(
                repo,
                pull.id,
                PullState::Merged,
                PullState::Open,
            ) {
                tracing::error!(
                    repo = repo,
                    pull = pull.id,
                    error = %rollback,
                    "Failed to reopen pull request after merge failure"
                );
            }
            return Err(e.into());
        }
    };

    let merged = ctx.state.records.update_pull(
        repo,
        pull.id,
        PullUpdate {
            merge_commit: Some(commit.id),
            ..PullUpdate::default()
        },
    )?;

    tracing::info!(repo = repo, pull = pull.id, user = user, "Pull request merged");
    Ok(Response::json(StatusCode::Ok, &merged)?)
}

/// `PUT /api/repo/{name}/pulls/{id}/close`
pub fn close_pull(ctx: &Context<'_>) -> ApiResult<Response> {
    let (repo, pull) = load(ctx)?;
    let closed = claim(ctx, repo, pull.id, PullState::Closed)?;
    Ok(Response::json(StatusCode::Ok, &closed)?)
}

/// Moves an open pull request to `to`; anything else is a `400`.
fn claim(ctx: &Context<'_>, repo: &str, id: u64, to: PullState) -> ApiResult<PullRequest> {
    ctx.state
        .records
        .transition_pull(repo, id, PullState::Open, to)
        .map_err(|e| match e {
            StoreError::Invalid(_) => {
                ApiError::bad_request(format!("Pull request #{id} is not open"))
            }
            other => other.into(),
        })
}

/// `PUT /api/repo/{name}/pulls/{id}/delete-branch`
///
/// Deletes the pull request's head branch once it is merged or closed.
pub fn delete_branch(ctx: &Context<'_>) -> ApiResult<Response> {
    let (repo, pull) = load(ctx)?;
    if pull.state == PullState::Open {
        return Err(ApiError::bad_request(format!(
            "Pull request #{} is still open",
            pull.id
        )));
    }

    let info = ctx.state.repos.repository(repo)?;
    if pull.head == info.default_branch {
        return Err(ApiError::forbidden(format!(
            "The default branch '{}' cannot be deleted",
            info.default_branch
        )));
    }

    ctx.state.repos.delete_branch(repo, &pull.head)?;
    tracing::info!(repo = repo, branch = %pull.head, "Branch deleted");

    Ok(Response::json(
        StatusCode::Ok,
        &json!({ "status": "success", "deleted": pull.head }),
    )?)
}
