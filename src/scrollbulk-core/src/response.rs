//! Turning a transport response into bytes or a classified error.

use crate::error::{ClientError, Result};
use crate::transport::Response;

/// Read the whole body of a successful response.
///
/// An error status becomes [`ClientError::Status`] carrying the body text for
/// diagnostics. The body is released on every path since `response` is
/// consumed.
pub async fn decode(mut response: Response) -> Result<Vec<u8>> {
    let status = response.status();

    if response.is_error() {
        let body = match read_body(&mut response).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<unreadable body: {}>", e),
        };
        release(Some(response));
        return Err(ClientError::Status { status, body });
    }

    let bytes = read_body(&mut response).await;
    release(Some(response));
    bytes
}

/// Give the body back to the connection pool. Accepts a missing response or
/// body.
pub fn release(response: Option<Response>) {
    if let Some(mut response) = response {
        drop(response.body.take());
    }
}

async fn read_body(response: &mut Response) -> Result<Vec<u8>> {
    match response.body.as_mut() {
        Some(body) => body.read_all().await,
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingBody, TrackedBody};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_decode_success_reads_and_releases() {
        let releases = Arc::new(AtomicUsize::new(0));
        let response = Response::new(
            200,
            Some(Box::new(TrackedBody::new(b"{\"ok\":true}".to_vec(), releases.clone()))),
        );

        let bytes = decode(response).await.unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_error_keeps_status_and_body() {
        let releases = Arc::new(AtomicUsize::new(0));
        let response = Response::new(
            400,
            Some(Box::new(TrackedBody::new(b"bad query".to_vec(), releases.clone()))),
        );

        match decode(response).await {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad query");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_without_body() {
        assert!(decode(Response::new(200, None)).await.unwrap().is_empty());

        let err = decode(Response::new(502, None)).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_decode_read_failure_still_releases() {
        let releases = Arc::new(AtomicUsize::new(0));
        let response = Response::new(200, Some(Box::new(FailingBody::new(releases.clone()))));

        let err = decode(response).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_tolerates_missing_parts() {
        release(None);
        release(Some(Response::new(204, None)));

        let releases = Arc::new(AtomicUsize::new(0));
        release(Some(Response::new(
            200,
            Some(Box::new(TrackedBody::new(Vec::new(), releases.clone()))),
        )));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
