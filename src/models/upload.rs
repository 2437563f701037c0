//! Transient upload request and the media types each upload kind accepts.

use uuid::Uuid;

/// One upload as handed from the HTTP layer to the orchestrator.
///
/// `body` is consumed lazily: nothing is read from it until the caller has
/// been authorized.
pub struct UploadRequest<S> {
    pub video_id: Uuid,
    pub bearer_token: String,
    pub content_type: String,
    pub body: S,
}

/// What is being uploaded. Each kind accepts a fixed set of media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Thumbnail images. No route uploads these yet.
    Image,
    Video,
}

impl UploadKind {
    pub fn accepted_types(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &["image/jpeg", "image/png"],
            Self::Video => &["video/mp4"],
        }
    }

    /// Return the canonical accepted media type matching `declared`.
    ///
    /// Parameters after `;` are ignored and the comparison is case-insensitive,
    /// otherwise the essence must match exactly.
    pub fn match_content_type(&self, declared: &str) -> Option<&'static str> {
        let essence = declared.split(';').next().unwrap_or_default().trim();
        self.accepted_types()
            .iter()
            .copied()
            .find(|accepted| accepted.eq_ignore_ascii_case(essence))
    }
}
