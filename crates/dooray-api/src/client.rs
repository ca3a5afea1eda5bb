//! HTTP client for the Dooray REST API.

use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    error::ApiError,
    types::{DirectMessage, DoorayResponse, Drive, DriveFile, Member, Project},
};

/// Default API host; tenants on a dedicated domain override it.
pub const DEFAULT_BASE_URL: &str = "https://api.dooray.com";

/// Streamed drive file content.
pub type DownloadStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Client for the Dooray REST API.
///
/// Redirect following is disabled on the inner `reqwest` client: the drive
/// content protocol answers with a temporary redirect to a separate
/// content-serving host that still requires the `dooray-api` credential, so
/// the single allowed hop is followed explicitly with the Authorization
/// header re-attached (see [`Self::download_file`]).
#[derive(Debug, Clone)]
pub struct DoorayClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl DoorayClient {
    /// Build a client for `base_url` authenticating with `api_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn auth_value(&self) -> String {
        format!("dooray-api {}", self.api_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<DoorayResponse<T>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, self.auth_value())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<DoorayResponse<T>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .header(AUTHORIZATION, self.auth_value())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn into_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<DoorayResponse<T>, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }

    // --- Common ---

    /// List organization members.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_members(&self) -> Result<DoorayResponse<Vec<Member>>, ApiError> {
        self.get_json("/common/v1/members", &[]).await
    }

    /// Fetch one organization member.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_member(&self, member_id: &str) -> Result<DoorayResponse<Member>, ApiError> {
        self.get_json(&format!("/common/v1/members/{member_id}"), &[])
            .await
    }

    // --- Drive ---

    /// List drives; `drive_type` is `private` or `team`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_drives(
        &self,
        drive_type: &str,
    ) -> Result<DoorayResponse<Vec<Drive>>, ApiError> {
        self.get_json("/drive/v1/drives", &[("type", drive_type)])
            .await
    }

    /// Fetch one drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_drive(&self, drive_id: &str) -> Result<DoorayResponse<Drive>, ApiError> {
        self.get_json(&format!("/drive/v1/drives/{drive_id}"), &[])
            .await
    }

    /// List the files of a drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_drive_files(
        &self,
        drive_id: &str,
    ) -> Result<DoorayResponse<Vec<DriveFile>>, ApiError> {
        self.get_json(&format!("/drive/v1/drives/{drive_id}/files"), &[])
            .await
    }

    /// Fetch metadata for one drive file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_drive_file(
        &self,
        drive_id: &str,
        file_id: &str,
    ) -> Result<DoorayResponse<DriveFile>, ApiError> {
        self.get_json(&format!("/drive/v1/drives/{drive_id}/files/{file_id}"), &[])
            .await
    }

    /// Stream a drive file's raw content.
    ///
    /// The API answers with a temporary redirect to the content-delivery
    /// host. Exactly one hop is followed, re-sending the original
    /// Authorization header; a missing Location header or a second redirect
    /// is a protocol error.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the request or the redirect hop fails at the transport level
    /// - the redirect response violates the one-hop protocol
    /// - either host answers with a non-success status
    #[instrument(skip(self))]
    pub async fn download_file(
        &self,
        drive_id: &str,
        file_id: &str,
    ) -> Result<DownloadStream, ApiError> {
        let url = format!(
            "{}/drive/v1/drives/{drive_id}/files/{file_id}",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .query(&[("media", "raw")])
            .header(AUTHORIZATION, self.auth_value())
            .send()
            .await?;

        let response = if response.status().is_redirection() {
            let location = redirect_target(&response, &self.base_url)?;
            debug!(%location, "following content redirect");
            let followed = self
                .http
                .get(&location)
                .header(AUTHORIZATION, self.auth_value())
                .send()
                .await?;
            if followed.status().is_redirection() {
                return Err(ApiError::RedirectLoop);
            }
            followed
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response.bytes_stream().boxed())
    }

    // --- Messenger ---

    /// Send a 1:1 message to an organization member.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn send_direct_message(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<DoorayResponse<serde_json::Value>, ApiError> {
        let body = DirectMessage {
            organization_member_id: recipient_id.to_string(),
            text: text.to_string(),
        };
        self.post_json("/messenger/v1/channels/direct-send", &body)
            .await
    }

    // --- Project ---

    /// List projects visible to the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn get_projects(&self) -> Result<DoorayResponse<Vec<Project>>, ApiError> {
        self.get_json("/project/v1/projects", &[]).await
    }
}

/// Resolve the Location header of a redirect response, allowing
/// host-relative targets.
fn redirect_target(response: &reqwest::Response, base_url: &str) -> Result<String, ApiError> {
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or(ApiError::MissingRedirectLocation)?
        .to_str()
        .map_err(|_| ApiError::InvalidRedirectLocation("not valid UTF-8".into()))?;
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(location.to_string())
    } else if location.starts_with('/') {
        Ok(format!("{base_url}{location}"))
    } else {
        Err(ApiError::InvalidRedirectLocation(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use reqwest::StatusCode;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    use super::*;

    fn client(server: &MockServer) -> DoorayClient {
        DoorayClient::new(&server.uri(), "test-token").unwrap()
    }

    const ENVELOPE_OK: &str = r#"{"header":{"isSuccessful":true,"resultCode":0,"resultMessage":""}"#;

    #[tokio::test]
    async fn get_members_parses_the_envelope() {
        let server = MockServer::start().await;
        let body = format!(
            r#"{ENVELOPE_OK},"result":[{{"id":"m-1","name":"Kim"}},{{"id":"m-2"}}]}}"#
        );
        Mock::given(method("GET"))
            .and(path("/common/v1/members"))
            .and(header("authorization", "dooray-api test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let response = client(&server).get_members().await.unwrap();
        assert!(response.header.is_successful);
        let members = response.result.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name.as_deref(), Some("Kim"));
    }

    #[tokio::test]
    async fn non_success_status_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/drives/d-1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such drive"))
            .mount(&server)
            .await;

        let err = client(&server).get_drive("d-1").await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "no such drive");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn download_without_redirect_streams_the_body() {
        let server = MockServer::start().await;
        let content = b"file content bytes";
        Mock::given(method("GET"))
            .and(path("/drive/v1/drives/d-1/files/f-1"))
            .and(query_param("media", "raw"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(*content))
            .mount(&server)
            .await;

        let stream = client(&server).download_file("d-1", "f-1").await.unwrap();
        let pieces: Vec<Bytes> = stream.try_collect().await.unwrap();
        let collected: Vec<u8> = pieces.concat();
        assert_eq!(collected, content);
    }

    #[tokio::test]
    async fn download_follows_one_redirect_with_credentials_reattached() {
        let server = MockServer::start().await;
        let content = b"redirected content";
        Mock::given(method("GET"))
            .and(path("/drive/v1/drives/d-1/files/f-1"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/content-host/f-1"),
            )
            .mount(&server)
            .await;
        // The content host still requires the dooray-api credential.
        Mock::given(method("GET"))
            .and(path("/content-host/f-1"))
            .and(header("authorization", "dooray-api test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(*content))
            .mount(&server)
            .await;

        let stream = client(&server).download_file("d-1", "f-1").await.unwrap();
        let pieces: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(pieces.concat(), content);
    }

    #[tokio::test]
    async fn redirect_without_location_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/drives/d-1/files/f-1"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let err = client(&server).download_file("d-1", "f-1").await.err().unwrap();
        assert!(matches!(err, ApiError::MissingRedirectLocation));
    }

    #[tokio::test]
    async fn second_redirect_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/drives/d-1/files/f-1"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/hop-1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hop-1"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/hop-2"))
            .mount(&server)
            .await;

        let err = client(&server).download_file("d-1", "f-1").await.err().unwrap();
        assert!(matches!(err, ApiError::RedirectLoop));
    }

    #[tokio::test]
    async fn send_direct_message_posts_the_camel_case_body() {
        let server = MockServer::start().await;
        let body = format!("{ENVELOPE_OK}}}");
        Mock::given(method("POST"))
            .and(path("/messenger/v1/channels/direct-send"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "organizationMemberId": "m-1",
                "text": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let response = client(&server)
            .send_direct_message("m-1", "hello")
            .await
            .unwrap();
        assert!(response.header.is_successful);
        assert!(response.result.is_none());
    }
}
