//! HTTP handlers for the file API

use crate::decode::decode;
use crate::middleware::Offer;
use crate::{ApiError, AppState};
use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, Request, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stow_blob::BlobError;
use stow_fs::{FileInfo, Name};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    parent: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct Created {
    #[serde(rename = "fileId")]
    file_id: Uuid,
}

#[derive(Debug, Serialize)]
struct FolderCreated {
    #[serde(rename = "folderId")]
    folder_id: Uuid,
}

/// Upload a file: the first multipart part is the content, its
/// filename is the entry name, and `?parent=` picks the folder.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|_| {
        ApiError::status(StatusCode::BAD_REQUEST, "parent id has an invalid format")
    })?;
    let mut multipart = multipart.map_err(|_| {
        ApiError::status(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected request body to be multipart/form-data",
        )
    })?;

    let field = multipart
        .next_field()
        .await
        .map_err(|err| {
            ApiError::status(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("failed to read multipart form: {err}"),
            )
        })?
        .ok_or_else(|| {
            ApiError::status(StatusCode::UNPROCESSABLE_ENTITY, "missing file part")
        })?;

    let name = Name::parse(field.file_name().unwrap_or_default()).map_err(ApiError::from)?;
    let body = field
        .map(|chunk| chunk.map_err(|err| BlobError::Io(std::io::Error::other(err))))
        .boxed();

    let file_id = state.fs.create(&name, query.parent, body).await?;
    Ok(Json(Created { file_id }).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CreateFolder {
    #[serde(default)]
    parent_id: Option<Uuid>,
    name: Name,
}

/// Create a folder from a JSON body
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Extension(offer): Extension<Offer>,
    req: Request,
) -> Result<Response, ApiError> {
    require_json(offer)?;
    let body: CreateFolder = decode(&state.config.decode_limits(), req).await?;
    let folder_id = state.fs.mkdir(&body.name, body.parent_id).await?;
    Ok(Json(FolderCreated { folder_id }).into_response())
}

/// Stream a file's content back to the client. Folders have no
/// content; asking for one is refused with an empty 403. HEAD gets the
/// same headers with no body.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    method: Method,
    file: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(file) = file.map_err(bad_path)?;
    let opened = state.fs.open(file).await?;
    if opened.info.is_dir {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, opened.mime)
        .header(header::CONTENT_LENGTH, opened.info.size);
    if let Some(etag) = &opened.etag {
        builder = builder.header(header::ETAG, format!("\"{etag}\""));
    }
    // dropping the unused reader tears the download pipe down
    if method == Method::HEAD {
        return Ok(builder.body(Body::empty()).unwrap());
    }
    let reader = opened
        .reader
        .ok_or_else(|| ApiError::Internal("opened file has no reader".to_owned()))?;
    Ok(builder.body(Body::from_stream(reader)).unwrap())
}

#[derive(Debug, Serialize)]
struct InfoBody {
    #[serde(flatten)]
    info: FileInfo,
    version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
}

/// Metadata view of one entry
pub async fn file_info(
    State(state): State<Arc<AppState>>,
    file: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(file) = file.map_err(bad_path)?;
    let stat = state.fs.stat(file).await?;
    Ok(Json(InfoBody {
        info: stat.info,
        version: stat.version,
        etag: stat.etag.map(|etag| etag.to_string()),
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Rename {
    name: Name,
    revision: i64,
}

/// Rename an entry, conditioned on the revision the client last saw
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Extension(offer): Extension<Offer>,
    file: Result<Path<Uuid>, PathRejection>,
    req: Request,
) -> Result<Response, ApiError> {
    require_json(offer)?;
    let Path(file) = file.map_err(bad_path)?;
    let body: Rename = decode(&state.config.decode_limits(), req).await?;
    state.fs.rename(file, &body.name, body.revision).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Readiness probe
pub async fn ready() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn require_json(offer: Offer) -> Result<(), ApiError> {
    if offer != Offer::Json {
        return Err(ApiError::status(
            StatusCode::NOT_ACCEPTABLE,
            "this endpoint only produces application/json",
        ));
    }
    Ok(())
}

fn bad_path(_: PathRejection) -> ApiError {
    ApiError::status(StatusCode::BAD_REQUEST, "file id has an invalid format")
}
