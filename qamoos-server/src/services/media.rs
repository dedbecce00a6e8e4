//! Glue between the services and [`MediaAssets`].

use qamoos_blob::{IngestError, MediaAssets, MediaKind, MediaUploads};
use qamoos_core::{DictError, DictResult, MediaField, RefUpdate};
use serde_json::json;

/// Staged-file problems are the client's; a failed upload is the remote store's.
pub fn media_error(err: IngestError) -> anyhow::Error {
    let message = err.to_string();
    let dict = match &err {
        IngestError::MissingFile { .. } => DictError::bad_request(message),
        IngestError::SizeLimitExceeded {
            kind,
            actual_size,
            limit,
        } => DictError::bad_request(message).with_data(json!({
            "mediaKind": kind,
            "size": actual_size,
            "limit": limit,
        })),
        IngestError::Upload(_) => DictError::bad_gateway(message),
        IngestError::Io { .. } => DictError::general_error(message),
    };
    dict.with_source(err.into()).into_anyhow()
}

/// Validate every attached file before anything remote happens.
pub async fn validate_uploads(media: &MediaAssets, uploads: &MediaUploads) -> DictResult<()> {
    for (target, file) in uploads.iter() {
        media
            .validate(file, target.kind())
            .await
            .map_err(media_error)?;
    }
    Ok(())
}

pub fn field_kind(field: MediaField) -> MediaKind {
    match field {
        MediaField::Image => MediaKind::Image,
        MediaField::Audio | MediaField::DialectAudio(_) => MediaKind::Audio,
    }
}

/// Owned copies of a record's refs, ready for [`MediaAssets::release_all`].
pub fn owned_refs(refs: Vec<(MediaField, &str)>) -> Vec<(String, MediaKind)> {
    refs.into_iter()
        .map(|(field, url)| (url.to_string(), field_kind(field)))
        .collect()
}

pub fn ref_update(before: Option<&str>, after: Option<&str>) -> RefUpdate {
    match (before, after) {
        (b, a) if b == a => RefUpdate::Keep,
        (_, Some(url)) => RefUpdate::Set(url.to_string()),
        (_, None) => RefUpdate::Clear,
    }
}

/// Release refs uploaded during a request that did not complete.
pub async fn release_uploaded(media: &MediaAssets, uploaded: &[(String, MediaKind)]) {
    if uploaded.is_empty() {
        return;
    }
    let outcomes = media.release_all(uploaded).await;
    let orphaned = outcomes.iter().filter(|o| !o.is_settled()).count();
    tracing::info!(released = outcomes.len() - orphaned, orphaned, "media rolled back");
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamoos_blob::BlobError;
    use qamoos_core::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn ingest_errors_map_to_transport_kinds() {
        let too_big = IngestError::SizeLimitExceeded {
            kind: MediaKind::Image,
            actual_size: 103_424,
            limit: 102_400,
        };
        let missing = IngestError::MissingFile {
            kind: MediaKind::Audio,
            path: PathBuf::from("/nope"),
        };
        let upload = IngestError::Upload(BlobError::upload_failed("boom"));

        let kinds: Vec<ErrorKind> = [too_big, missing, upload]
            .into_iter()
            .map(|e| DictError::normalize(media_error(e)).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::BadRequest, ErrorKind::BadRequest, ErrorKind::BadGateway]
        );
    }

    #[test]
    fn size_limit_reports_the_ceiling() {
        let err = media_error(IngestError::SizeLimitExceeded {
            kind: MediaKind::Audio,
            actual_size: 205_824,
            limit: 204_800,
        });
        let body = DictError::normalize(err).sanitize_for_client().to_json();
        assert_eq!(body["data"]["mediaKind"], "audio");
        assert_eq!(body["data"]["size"], 205_824);
        assert_eq!(body["data"]["limit"], 204_800);
    }

    #[test]
    fn ref_updates_only_when_changed() {
        assert_eq!(ref_update(Some("a"), Some("a")), RefUpdate::Keep);
        assert_eq!(ref_update(None, None), RefUpdate::Keep);
        assert_eq!(ref_update(Some("a"), Some("b")), RefUpdate::Set("b".into()));
        assert_eq!(ref_update(Some("a"), None), RefUpdate::Clear);
    }
}
