//! Route handlers.
//!
//! Handlers are the only place where [`ShelfDbError`] categories become
//! status codes; everything below them returns typed errors untouched.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use super::schemas::*;
use super::AppState;
use crate::error::ShelfDbError;

/// Newtype so the core error can carry an axum `IntoResponse` impl.
pub struct ApiError(ShelfDbError);

impl From<ShelfDbError> for ApiError {
    fn from(err: ShelfDbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ShelfDbError::LibraryNotFound(_)
            | ShelfDbError::DocumentNotFound { .. }
            | ShelfDbError::ChunkNotFound { .. }
            | ShelfDbError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            ShelfDbError::IndexNotReady(_) => StatusCode::CONFLICT,
            ShelfDbError::DimensionMismatch { .. } | ShelfDbError::ConfigInvalid(_) => {
                StatusCode::BAD_REQUEST
            }
            ShelfDbError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ShelfDbError::Embedding(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(ErrorBody {
            detail: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready".to_string(),
        libraries: state.libraries.list_libraries().len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// --- libraries ---

pub async fn create_library(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LibraryCreateBody>,
) -> impl IntoResponse {
    let library = state.libraries.create_library(body.metadata);
    (
        StatusCode::CREATED,
        Json(LibraryResponse::from_model(&library)),
    )
}

pub async fn list_libraries(State(state): State<Arc<AppState>>) -> Json<Vec<LibraryResponse>> {
    let libraries = state.libraries.list_libraries();
    Json(libraries.iter().map(LibraryResponse::from_model).collect())
}

pub async fn get_library(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> ApiResult<Json<LibraryResponse>> {
    let library = state.libraries.get_library(library_id)?;
    Ok(Json(LibraryResponse::from_model(&library)))
}

pub async fn update_library(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
    Json(body): Json<LibraryUpdateBody>,
) -> ApiResult<Json<LibraryResponse>> {
    let library = state.libraries.update_library(library_id, body.metadata)?;
    Ok(Json(LibraryResponse::from_model(&library)))
}

pub async fn delete_library(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.libraries.delete_library(library_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- documents ---

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
    Json(body): Json<DocumentCreateBody>,
) -> ApiResult<Response> {
    let document = state
        .documents
        .create_document(library_id, body.into_create())
        .await?;

    let mut headers = HeaderMap::new();
    let location = format!("/libraries/{}/documents/{}", library_id, document.id);
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(DocumentResponse::from_model(&document, library_id)),
    )
        .into_response())
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    let documents = state.documents.list_documents(library_id)?;
    Ok(Json(
        documents
            .iter()
            .map(|doc| DocumentResponse::from_model(doc, library_id))
            .collect(),
    ))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DocumentResponse>> {
    let document = state.documents.get_document(library_id, document_id)?;
    Ok(Json(DocumentResponse::from_model(&document, library_id)))
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<DocumentUpdateBody>,
) -> ApiResult<Json<DocumentResponse>> {
    let document = state
        .documents
        .update_document(library_id, document_id, body.metadata)?;
    Ok(Json(DocumentResponse::from_model(&document, library_id)))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.documents.delete_document(library_id, document_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- chunks ---

pub async fn create_chunk(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ChunkCreateBody>,
) -> ApiResult<(StatusCode, Json<ChunkResponse>)> {
    let chunk = state
        .chunks
        .create_chunk(library_id, document_id, body.into_create())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ChunkResponse::from_model(&chunk, library_id, document_id)),
    ))
}

pub async fn list_chunks(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<ChunkResponse>>> {
    let chunks = state.chunks.list_chunks(library_id, document_id)?;
    Ok(Json(
        chunks
            .iter()
            .map(|chunk| ChunkResponse::from_model(chunk, library_id, document_id))
            .collect(),
    ))
}

pub async fn get_chunk(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id, chunk_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<ChunkResponse>> {
    let chunk = state.chunks.get_chunk(library_id, document_id, chunk_id)?;
    Ok(Json(ChunkResponse::from_model(
        &chunk,
        library_id,
        document_id,
    )))
}

pub async fn update_chunk(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id, chunk_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<ChunkUpdateBody>,
) -> ApiResult<Json<ChunkResponse>> {
    let chunk = state
        .chunks
        .update_chunk(library_id, document_id, chunk_id, body.into_update())
        .await?;
    Ok(Json(ChunkResponse::from_model(
        &chunk,
        library_id,
        document_id,
    )))
}

pub async fn delete_chunk(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id, chunk_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .chunks
        .delete_chunk(library_id, document_id, chunk_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- indexes ---

pub async fn create_index(
    State(state): State<Arc<AppState>>,
    Path((library_id, name)): Path<(Uuid, String)>,
    Json(body): Json<IndexCreateBody>,
) -> ApiResult<(StatusCode, Json<IndexStatusResponse>)> {
    let metadata = state
        .indexes
        .create_index(library_id, &name, body.into_config())?;
    Ok((
        StatusCode::CREATED,
        Json(IndexStatusResponse::from_metadata(&metadata)),
    ))
}

pub async fn list_indexes(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<Uuid>,
) -> ApiResult<Json<Vec<IndexStatusResponse>>> {
    let all = state.indexes.list_indexes(library_id)?;
    Ok(Json(
        all.iter().map(IndexStatusResponse::from_metadata).collect(),
    ))
}

pub async fn get_index(
    State(state): State<Arc<AppState>>,
    Path((library_id, name)): Path<(Uuid, String)>,
) -> ApiResult<Json<IndexStatusResponse>> {
    let metadata = state.indexes.get_index(library_id, &name)?;
    Ok(Json(IndexStatusResponse::from_metadata(&metadata)))
}

pub async fn delete_index(
    State(state): State<Arc<AppState>>,
    Path((library_id, name)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    state.indexes.delete_index(library_id, &name)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- search ---

pub async fn search(
    State(state): State<Arc<AppState>>,
    Path((library_id, name)): Path<(Uuid, String)>,
    Json(body): Json<SearchRequestBody>,
) -> ApiResult<Json<Vec<SearchResultBody>>> {
    let results = state
        .search
        .search(
            library_id,
            &name,
            body.query_embedding,
            body.query_text,
            body.k,
        )
        .await?;
    Ok(Json(
        results
            .into_iter()
            .map(|(chunk, similarity)| SearchResultBody { chunk, similarity })
            .collect(),
    ))
}
