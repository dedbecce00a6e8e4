//! Pure mapping between asset URLs and store requests.
//!
//! A delivery URL looks like
//! `https://res.cloudinary.com/<cloud>/image/upload/q_auto,f_auto/v1712/pashto_dict/abc.jpg`.
//! Its public id is the path after the `/upload/` marker with the leading
//! transformation and version segments and the file extension removed:
//! `pashto_dict/abc`.

use crate::config::IngestRules;
use crate::types::{DeleteRequest, MediaKind, PublicId, UploadOptions};

const UPLOAD_MARKER: &str = "/upload/";

/// Derive the public id of an asset from its URL. `None` when the URL has
/// no `/upload/` marker or nothing is left after stripping.
pub fn resolve_public_id(url: &str) -> Option<PublicId> {
    let (_, tail) = url.split_once(UPLOAD_MARKER)?;

    let segments: Vec<&str> = tail
        .split('/')
        .skip_while(|seg| is_version(seg) || is_transformation(seg))
        .collect();
    let joined = segments.join("/");
    let id = strip_extension(&joined);

    if id.is_empty() {
        None
    } else {
        Some(PublicId::new(id))
    }
}

pub fn delete_request(url: &str, kind: MediaKind) -> Option<DeleteRequest> {
    resolve_public_id(url).map(|public_id| DeleteRequest {
        public_id,
        resource_type: kind.resource_type(),
    })
}

pub fn upload_request(
    kind: MediaKind,
    source_extension: Option<&str>,
    rules: &IngestRules,
) -> UploadOptions {
    let format = match (kind, source_extension) {
        (MediaKind::Audio, Some(ext)) if rules.converts_to_mp3(ext) => Some("mp3".to_string()),
        _ => None,
    };
    UploadOptions {
        folder: rules.folder.clone(),
        resource_type: kind.resource_type(),
        format,
    }
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn is_transformation(segment: &str) -> bool {
    segment.contains(',')
}

/// Drop a trailing `.ext` where `ext` has no `.` or `/`.
fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if dot + 1 < path.len() && !path[dot + 1..].contains('/') => &path[..dot],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceType;

    fn id(url: &str) -> Option<String> {
        resolve_public_id(url).map(|p| p.as_str().to_string())
    }

    #[test]
    fn strips_version_and_extension() {
        assert_eq!(
            id("https://host/x/image/upload/v123/pashto_dict/a.jpg").as_deref(),
            Some("pashto_dict/a")
        );
    }

    #[test]
    fn strips_transformation_before_version() {
        assert_eq!(
            id("https://host/x/image/upload/q_auto,f_auto/v123/pashto_dict/b.mp3").as_deref(),
            Some("pashto_dict/b")
        );
    }

    #[test]
    fn keeps_inner_segments_that_look_like_versions() {
        assert_eq!(
            id("https://host/x/video/upload/v9/pashto_dict/v12/clip.webm").as_deref(),
            Some("pashto_dict/v12/clip")
        );
    }

    #[test]
    fn url_without_extension_or_version() {
        assert_eq!(
            id("https://host/x/image/upload/pashto_dict/plain").as_deref(),
            Some("pashto_dict/plain")
        );
    }

    #[test]
    fn malformed_input_resolves_to_none() {
        for url in [
            "",
            "not a url",
            "https://host/x/image/v123/a.jpg",
            "https://host/x/image/upload/",
            "https://host/x/image/upload/v1/",
            "https://host/x/image/upload/q_auto,f_auto/v1",
        ] {
            assert_eq!(id(url), None, "{url}");
        }
    }

    #[test]
    fn resolving_is_idempotent() {
        let first = id("https://host/x/image/upload/c_fill,w_200/v77/pashto_dict/x.png").unwrap();
        let again = id(&format!("https://host/x/image/upload/v1/{first}.png")).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn delete_request_uses_video_for_audio() {
        let req = delete_request("https://h/x/video/upload/v1/pashto_dict/s.mp3", MediaKind::Audio)
            .unwrap();
        assert_eq!(req.resource_type, ResourceType::Video);
        assert_eq!(req.public_id.as_str(), "pashto_dict/s");
    }

    #[test]
    fn webm_audio_is_converted_to_mp3() {
        let rules = IngestRules::default();
        let audio = upload_request(MediaKind::Audio, Some("webm"), &rules);
        assert_eq!(audio.format.as_deref(), Some("mp3"));
        assert_eq!(audio.resource_type, ResourceType::Video);
        assert_eq!(audio.folder, "pashto_dict");

        let wav = upload_request(MediaKind::Audio, Some("wav"), &rules);
        assert_eq!(wav.format, None);

        let image = upload_request(MediaKind::Image, Some("webm"), &rules);
        assert_eq!(image.format, None);
        assert_eq!(image.resource_type, ResourceType::Image);
    }
}
