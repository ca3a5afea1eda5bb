//! Adapter from the Dooray API client to the transfer core's file source.

use std::sync::Arc;

use async_trait::async_trait;
use dooray_api::{ApiError, DoorayClient, StatusCode};
use dooray_transfer::{FileLocator, FileMetadata, FileSource, SourceError, SourceStream};
use futures::StreamExt;

/// Drive files served through [`DoorayClient`].
#[derive(Debug, Clone)]
pub struct DoorayFileSource {
    client: Arc<DoorayClient>,
}

impl DoorayFileSource {
    pub fn new(client: Arc<DoorayClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileSource for DoorayFileSource {
    async fn fetch_metadata(&self, locator: &FileLocator) -> Result<FileMetadata, SourceError> {
        let response = self
            .client
            .get_drive_file(&locator.drive_id, &locator.file_id)
            .await
            .map_err(map_api_error)?;
        let file = response
            .result
            .ok_or_else(|| SourceError::Protocol("file metadata envelope had no result".into()))?;
        Ok(FileMetadata {
            name: file.name,
            size: file.size.unwrap_or(0),
        })
    }

    async fn open_stream(&self, locator: &FileLocator) -> Result<SourceStream, SourceError> {
        let stream = self
            .client
            .download_file(&locator.drive_id, &locator.file_id)
            .await
            .map_err(map_api_error)?;
        Ok(stream
            .map(|piece| piece.map_err(|e| SourceError::Network(e.to_string())))
            .boxed())
    }
}

fn map_api_error(err: ApiError) -> SourceError {
    match err {
        ApiError::Status { status, body } if status == StatusCode::NOT_FOUND => {
            SourceError::NotFound(body)
        }
        ApiError::Status { status, body }
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
        {
            SourceError::Unauthorized(body)
        }
        ApiError::MissingRedirectLocation
        | ApiError::InvalidRedirectLocation(_)
        | ApiError::RedirectLoop => SourceError::Protocol(err.to_string()),
        other => SourceError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_source_kinds() {
        let err = map_api_error(ApiError::Status {
            status: StatusCode::NOT_FOUND,
            body: "gone".into(),
        });
        assert!(matches!(err, SourceError::NotFound(_)));

        let err = map_api_error(ApiError::Status {
            status: StatusCode::FORBIDDEN,
            body: "nope".into(),
        });
        assert!(matches!(err, SourceError::Unauthorized(_)));

        let err = map_api_error(ApiError::MissingRedirectLocation);
        assert!(matches!(err, SourceError::Protocol(_)));

        let err = map_api_error(ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream sad".into(),
        });
        assert!(matches!(err, SourceError::Network(_)));
    }
}
