//! Typed client for the Dooray collaboration suite REST API.
//!
//! Covers the operations the gateway forwards (members, drives, drive files,
//! messenger, projects) plus the drive content download, which follows
//! Dooray's redirect-based retrieval protocol: the API host answers with a
//! temporary redirect to a content-delivery host that still requires the
//! `dooray-api` credential, so the client follows exactly one hop with the
//! Authorization header re-attached.
//!
//! The hundreds of sibling endpoints (wiki, calendar, reservations, project
//! posts and comments) all share the request/envelope shape implemented here
//! and can be added as further thin wrappers on [`DoorayClient`].

mod client;
mod error;
mod types;

pub use client::{DEFAULT_BASE_URL, DoorayClient, DownloadStream};
pub use error::ApiError;
// Re-exported so callers can match on upstream statuses without depending on
// the HTTP client crate themselves.
pub use reqwest::StatusCode;
pub use types::{DirectMessage, DoorayResponse, Drive, DriveFile, Member, Project, ResponseHeader};
