use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{ClipKind, ClipPayload, StitchClip, TimelineError};

/// Timeline lane. Images and videos share the video track. The buffer is a
/// staging lane that is never stitched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Video,
    Audio,
    Buffer,
}

impl Track {
    /// Stitched track for a clip kind.
    pub fn for_kind(kind: ClipKind) -> Self {
        match kind {
            ClipKind::Image | ClipKind::Video => Self::Video,
            ClipKind::Audio => Self::Audio,
        }
    }

    pub fn accepts(&self, kind: ClipKind) -> bool {
        match self {
            Self::Buffer => true,
            track => Self::for_kind(kind) == *track,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Buffer => write!(f, "buffer"),
        }
    }
}

/// Body of `POST /api/stitch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StitchRequest {
    pub clips: Vec<ClipPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audio_clips: Vec<ClipPayload>,
}

/// Ordered clip lists, one per track. At most one clip per node id per track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StitchTimeline {
    video: Vec<StitchClip>,
    audio: Vec<StitchClip>,
    #[serde(default)]
    buffer: Vec<StitchClip>,
}

impl StitchTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, track: Track) -> &[StitchClip] {
        match track {
            Track::Video => &self.video,
            Track::Audio => &self.audio,
            Track::Buffer => &self.buffer,
        }
    }

    fn track_mut(&mut self, track: Track) -> &mut Vec<StitchClip> {
        match track {
            Track::Video => &mut self.video,
            Track::Audio => &mut self.audio,
            Track::Buffer => &mut self.buffer,
        }
    }

    pub fn contains(&self, track: Track, node_id: &str) -> bool {
        self.track(track).iter().any(|c| c.node_id == node_id)
    }

    pub fn is_empty(&self, track: Track) -> bool {
        self.track(track).is_empty()
    }

    pub fn len(&self, track: Track) -> usize {
        self.track(track).len()
    }

    /// Appends a clip to the track matching its kind and returns its index.
    pub fn push(&mut self, clip: StitchClip) -> Result<usize, TimelineError> {
        let track = Track::for_kind(clip.kind());
        self.append(track, clip)
    }

    /// Appends a clip to the buffer lane.
    pub fn stage(&mut self, clip: StitchClip) -> Result<usize, TimelineError> {
        self.append(Track::Buffer, clip)
    }

    fn append(&mut self, track: Track, clip: StitchClip) -> Result<usize, TimelineError> {
        if self.contains(track, &clip.node_id) {
            return Err(TimelineError::DuplicateClip(clip.node_id, track));
        }
        let list = self.track_mut(track);
        list.push(clip);
        debug!(%track, len = list.len(), "clip queued");
        Ok(list.len() - 1)
    }

    /// Moves a buffered clip onto a stitched track, before `at` or at the end.
    /// Returns its new index. Nothing changes on error.
    pub fn transfer(&mut self, from: usize, to: Track, at: Option<usize>) -> Result<usize, TimelineError> {
        let Some(clip) = self.buffer.get(from) else {
            return Err(TimelineError::IndexOutOfRange {
                track: Track::Buffer,
                index: from,
                len: self.buffer.len(),
            });
        };
        if to == Track::Buffer || !to.accepts(clip.kind()) {
            return Err(TimelineError::WrongTrack { kind: clip.kind(), track: to });
        }
        if self.contains(to, &clip.node_id) {
            return Err(TimelineError::DuplicateClip(clip.node_id.clone(), to));
        }
        let clip = self.buffer.remove(from);
        let list = self.track_mut(to);
        let index = at.map_or(list.len(), |at| at.min(list.len()));
        list.insert(index, clip);
        debug!(track = %to, index, "clip moved out of the buffer");
        Ok(index)
    }

    pub fn remove(&mut self, track: Track, index: usize) -> Result<StitchClip, TimelineError> {
        let list = self.track_mut(track);
        if index >= list.len() {
            return Err(TimelineError::IndexOutOfRange {
                track,
                index,
                len: list.len(),
            });
        }
        Ok(list.remove(index))
    }

    pub fn clip_mut(&mut self, track: Track, index: usize) -> Option<&mut StitchClip> {
        self.track_mut(track).get_mut(index)
    }

    /// Applies `edit` to the clip at `index` of `track`.
    pub fn edit<R>(
        &mut self,
        track: Track,
        index: usize,
        edit: impl FnOnce(&mut StitchClip) -> Result<R, TimelineError>,
    ) -> Result<R, TimelineError> {
        let list = self.track_mut(track);
        let len = list.len();
        match list.get_mut(index) {
            Some(clip) => edit(clip),
            None => Err(TimelineError::IndexOutOfRange { track, index, len }),
        }
    }

    /// Adopts a reordered copy of a track. The new order must hold exactly the
    /// same clips (by node id) as the current one.
    pub fn adopt(&mut self, track: Track, order: Vec<StitchClip>) -> Result<(), TimelineError> {
        let current = self.track(track);
        let mut expected: Vec<&str> = current.iter().map(|c| c.node_id.as_str()).collect();
        let mut incoming: Vec<&str> = order.iter().map(|c| c.node_id.as_str()).collect();
        expected.sort_unstable();
        incoming.sort_unstable();
        if expected != incoming {
            return Err(TimelineError::InvalidOrder(track));
        }
        *self.track_mut(track) = order;
        Ok(())
    }

    pub fn total_duration(&self, track: Track) -> f64 {
        self.track(track).iter().map(StitchClip::duration).sum()
    }

    pub fn clear(&mut self) {
        self.video.clear();
        self.audio.clear();
        self.buffer.clear();
    }

    /// Builds the stitch request. Needs at least one clip on the video track;
    /// buffered clips are left out.
    pub fn request(&self) -> Result<StitchRequest, TimelineError> {
        if self.video.is_empty() {
            return Err(TimelineError::NoClips);
        }
        Ok(StitchRequest {
            clips: self.video.iter().map(StitchClip::payload).collect(),
            audio_clips: self.audio.iter().map(StitchClip::payload).collect(),
        })
    }
}
