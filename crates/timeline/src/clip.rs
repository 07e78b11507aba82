use serde::{Deserialize, Serialize};

use crate::TimelineError;

/// Display duration given to still images when they enter the sequence.
pub const DEFAULT_IMAGE_DURATION: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Image,
    Video,
    Audio,
}

impl ClipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Type-specific trim data carried by a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClipSpan {
    Image {
        duration: f64,
    },
    Video {
        #[serde(rename = "startTime")]
        start_time: f64,
        #[serde(rename = "endTime")]
        end_time: f64,
        #[serde(rename = "totalDuration")]
        total_duration: f64,
    },
    Audio {
        duration: f64,
    },
}

/// A trimmed reference to one node's media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StitchClip {
    pub node_id: String,
    /// Backend-relative path, sent back verbatim in the stitch request.
    pub media_path: String,
    pub thumbnail_url: String,
    #[serde(flatten)]
    pub span: ClipSpan,
}

fn check_duration(duration: f64) -> Result<f64, TimelineError> {
    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(TimelineError::InvalidDuration(duration))
    }
}

impl StitchClip {
    pub fn image(
        node_id: impl Into<String>,
        media_path: impl Into<String>,
        thumbnail_url: impl Into<String>,
        duration: f64,
    ) -> Result<Self, TimelineError> {
        Ok(Self {
            node_id: node_id.into(),
            media_path: media_path.into(),
            thumbnail_url: thumbnail_url.into(),
            span: ClipSpan::Image {
                duration: check_duration(duration)?,
            },
        })
    }

    /// Video clips start out untrimmed: `[0, total_duration]`.
    pub fn video(
        node_id: impl Into<String>,
        media_path: impl Into<String>,
        thumbnail_url: impl Into<String>,
        total_duration: f64,
    ) -> Result<Self, TimelineError> {
        let total = check_duration(total_duration)?;
        Ok(Self {
            node_id: node_id.into(),
            media_path: media_path.into(),
            thumbnail_url: thumbnail_url.into(),
            span: ClipSpan::Video {
                start_time: 0.0,
                end_time: total,
                total_duration: total,
            },
        })
    }

    pub fn audio(
        node_id: impl Into<String>,
        media_path: impl Into<String>,
        thumbnail_url: impl Into<String>,
        duration: f64,
    ) -> Result<Self, TimelineError> {
        Ok(Self {
            node_id: node_id.into(),
            media_path: media_path.into(),
            thumbnail_url: thumbnail_url.into(),
            span: ClipSpan::Audio {
                duration: check_duration(duration)?,
            },
        })
    }

    pub fn kind(&self) -> ClipKind {
        match self.span {
            ClipSpan::Image { .. } => ClipKind::Image,
            ClipSpan::Video { .. } => ClipKind::Video,
            ClipSpan::Audio { .. } => ClipKind::Audio,
        }
    }

    /// Playable length in seconds after trimming.
    pub fn duration(&self) -> f64 {
        match self.span {
            ClipSpan::Image { duration } | ClipSpan::Audio { duration } => duration,
            ClipSpan::Video {
                start_time,
                end_time,
                ..
            } => end_time - start_time,
        }
    }

    pub fn set_trim(&mut self, start: f64, end: f64) -> Result<(), TimelineError> {
        let kind = self.kind();
        let ClipSpan::Video {
            start_time,
            end_time,
            total_duration,
        } = &mut self.span
        else {
            return Err(TimelineError::WrongKind(kind));
        };
        let total = *total_duration;
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || end > total || start >= end {
            return Err(TimelineError::InvalidTrim { start, end, total });
        }
        *start_time = start;
        *end_time = end;
        Ok(())
    }

    /// Sets the display duration of an image clip.
    pub fn set_duration(&mut self, duration: f64) -> Result<(), TimelineError> {
        let kind = self.kind();
        match &mut self.span {
            ClipSpan::Image { duration: d } => {
                *d = check_duration(duration)?;
                Ok(())
            }
            _ => Err(TimelineError::WrongKind(kind)),
        }
    }

    pub fn payload(&self) -> ClipPayload {
        let path = self.media_path.clone();
        match self.span {
            ClipSpan::Image { duration } => ClipPayload::Image { path, duration },
            ClipSpan::Video {
                start_time,
                end_time,
                ..
            } => ClipPayload::Video {
                path,
                start_time,
                end_time,
            },
            ClipSpan::Audio { duration } => ClipPayload::Audio { path, duration },
        }
    }
}

/// Wire shape of one clip in the stitch request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClipPayload {
    Image {
        path: String,
        duration: f64,
    },
    Video {
        path: String,
        #[serde(rename = "startTime")]
        start_time: f64,
        #[serde(rename = "endTime")]
        end_time: f64,
    },
    Audio {
        path: String,
        duration: f64,
    },
}
