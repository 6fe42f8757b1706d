//! HTTP glue: turn repository results into hyper::Response<Body>.

use bytes::{Bytes, BytesMut};
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::sys_core::response::json_response;
use crate::sys_fileapi::core::{ContractRecord, ContractRepository, PDF_MEDIA_TYPE};
use crate::sys_fileapi::metadata::PartnerFields;

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "pdf";

#[derive(Serialize)]
struct UploadResponse<'a> {
    success: bool,
    message: &'a str,
    file: ContractRecord,
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    contracts: Vec<ContractRecord>,
}

#[derive(Serialize)]
struct MessageResponse<'a> {
    success: bool,
    message: &'a str,
}

/// The PDF part of an upload form.
struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    pdf: Option<UploadedFile>,
    partner: PartnerFields,
}

/// `POST /upload-pdf`
pub async fn handler_upload(
    req: Request<Body>,
    repo: &ContractRepository,
    max_bytes: u64,
) -> Result<Response<Body>, ApiError> {
    let ct = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Missing Content-Type.".into()))?;
    let boundary = multer::parse_boundary(ct)
        .map_err(|e| ApiError::Validation(format!("Bad multipart boundary: {e}")))?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_bytes));
    let mut multipart = Multipart::with_constraints(req.into_body(), boundary, constraints);
    let form = read_upload_form(&mut multipart).await?;

    let upload = form
        .pdf
        .ok_or_else(|| ApiError::Validation("No PDF file was uploaded.".into()))?;
    let record = repo
        .store(&upload.bytes, &upload.file_name, &upload.content_type, form.partner)
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &UploadResponse {
            success: true,
            message: "PDF saved on the server.",
            file: record,
        },
    ))
}

async fn read_upload_form(multipart: &mut Multipart<'_>) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_default();
            let mut buf = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                buf.extend_from_slice(&chunk);
            }
            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && buf.is_empty() {
                continue;
            }
            form.pdf = Some(UploadedFile {
                file_name,
                content_type,
                bytes: buf.freeze(),
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            if !form.partner.set(&name, value) {
                debug!(field = %name, "ignoring unknown form field");
            }
        }
    }
    Ok(form)
}

fn multipart_error(err: multer::Error) -> ApiError {
    match err {
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            ApiError::Validation("Upload is too large.".into())
        }
        other => ApiError::Validation(format!("Invalid form data: {other}")),
    }
}

/// `GET /contracts`
pub async fn handler_list(repo: &ContractRepository) -> Result<Response<Body>, ApiError> {
    let contracts = repo
        .list()
        .await
        .map_err(|e| ApiError::internal("Could not load the contract list.", e))?;
    Ok(json_response(
        StatusCode::OK,
        &ListResponse {
            success: true,
            contracts,
        },
    ))
}

/// `GET /download/:filename`
pub async fn handler_download(
    repo: &ContractRepository,
    raw_name: &str,
) -> Result<Response<Body>, ApiError> {
    let filename = decode_segment(raw_name)?;
    let (file, len) = repo.fetch(&filename).await?;

    let disposition = HeaderValue::from_str(&attachment_disposition(&filename))
        .map_err(|e| ApiError::internal("File download failed.", e))?;
    let mut resp = Response::new(Body::wrap_stream(ReaderStream::new(file)));
    let headers = resp.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(PDF_MEDIA_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(resp)
}

/// `DELETE /delete/:filename`
pub async fn handler_remove(
    repo: &ContractRepository,
    raw_name: &str,
) -> Result<Response<Body>, ApiError> {
    let filename = decode_segment(raw_name)?;
    repo.remove(&filename).await?;
    Ok(json_response(
        StatusCode::OK,
        &MessageResponse {
            success: true,
            message: "File deleted.",
        },
    ))
}

fn decode_segment(raw: &str) -> Result<String, ApiError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| ApiError::NotFound("File not found.".into()))
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form.
fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
