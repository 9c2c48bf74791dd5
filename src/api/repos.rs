use serde::{Deserialize, Serialize};

use crate::api::{decode_path, json_body, validate_name};
use crate::error::ApiResult;
use crate::http::mime;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::router::Context;
use crate::store::{Branch, RepositoryInfo};

#[derive(Debug, Deserialize)]
struct CreateRepository {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateBranch {
    name: String,
    /// Defaults to the repository's default branch.
    #[serde(default)]
    from: Option<String>,
}

#[derive(Debug, Serialize)]
struct RepositoryDetail {
    #[serde(flatten)]
    info: RepositoryInfo,
    branches: Vec<Branch>,
}

#[derive(Debug, Serialize)]
struct BlobBody<'a> {
    path: &'a str,
    size: usize,
    /// "utf-8" or "hex"
    encoding: &'static str,
    content: String,
}

/// `GET /api/repos`
pub fn list_repositories(ctx: &Context<'_>) -> ApiResult<Response> {
    let repos = ctx.state.repos.list_repositories()?;
    Ok(Response::json(StatusCode::Ok, &repos)?)
}

/// `POST /api/repos`
pub fn create_repository(ctx: &Context<'_>) -> ApiResult<Response> {
    let owner = ctx.username()?;
    let body: CreateRepository = json_body(ctx.request)?;
    validate_name(&body.name, "repository")?;

    let info = ctx.state.repos.create_repository(
        &body.name,
        body.description.as_deref().unwrap_or_default(),
        owner,
    )?;
    Ok(Response::json(StatusCode::Created, &info)?)
}

/// `GET /api/repo/{name}`
pub fn get_repository(ctx: &Context<'_>) -> ApiResult<Response> {
    let name = ctx.param("name")?;
    let detail = RepositoryDetail {
        info: ctx.state.repos.repository(name)?,
        branches: ctx.state.repos.branches(name)?,
    };
    Ok(Response::json(StatusCode::Ok, &detail)?)
}

/// `GET /api/repo/{name}/branches`
pub fn list_branches(ctx: &Context<'_>) -> ApiResult<Response> {
    let branches = ctx.state.repos.branches(ctx.param("name")?)?;
    Ok(Response::json(StatusCode::Ok, &branches)?)
}

/// `POST /api/repo/{name}/branches`
pub fn create_branch(ctx: &Context<'_>) -> ApiResult<Response> {
    let repo = ctx.param("name")?;
    let body: CreateBranch = json_body(ctx.request)?;
    validate_name(&body.name, "branch")?;

    let from = match body.from {
        Some(from) => from,
        None => ctx.state.repos.repository(repo)?.default_branch,
    };
    let branch = ctx.state.repos.create_branch(repo, &body.name, &from)?;

    tracing::info!(repo = repo, branch = %branch.name, from = %from, "Branch created");
    Ok(Response::json(StatusCode::Created, &branch)?)
}

/// `GET /api/repo/{name}/commits/{branch}`
pub fn list_commits(ctx: &Context<'_>) -> ApiResult<Response> {
    let commits = ctx
        .state
        .repos
        .commits(ctx.param("name")?, ctx.param("branch")?)?;
    Ok(Response::json(StatusCode::Ok, &commits)?)
}

/// `GET /api/repo/{name}/tree/{branch}` and `.../tree/{branch}/{path}`.
///
/// `{path}` is one segment; nested directories are sent percent-encoded
/// (`src%2Fhttp`).
pub fn tree(ctx: &Context<'_>) -> ApiResult<Response> {
    let path = match ctx.params.get("path") {
        Some(raw) => decode_path(raw)?,
        None => String::new(),
    };
    let entries = ctx
        .state
        .repos
        .tree(ctx.param("name")?, ctx.param("branch")?, &path)?;
    Ok(Response::json(StatusCode::Ok, &entries)?)
}

/// `GET /api/repo/{name}/blob/{branch}/{path}`
///
/// Returns JSON by default; `?raw=1` returns the bytes with a content type
/// guessed from the file name.
pub fn blob(ctx: &Context<'_>) -> ApiResult<Response> {
    let path = decode_path(ctx.param("path")?)?;
    let blob = ctx
        .state
        .repos
        .blob(ctx.param("name")?, ctx.param("branch")?, &path)?;

    if matches!(ctx.request.query_param("raw"), Some("1") | Some("true")) {
        return Ok(ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", mime::content_type(std::path::Path::new(&blob.path)))
            .body(blob.content)
            .build());
    }

    let size = blob.content.len();
    let (encoding, content) = match String::from_utf8(blob.content) {
        Ok(text) => ("utf-8", text),
        Err(e) => ("hex", hex::encode(e.into_bytes())),
    };
    let body = BlobBody {
        path: &blob.path,
        size,
        encoding,
        content,
    };
    Ok(Response::json(StatusCode::Ok, &body)?)
}
