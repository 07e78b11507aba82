use timeline::{layout_ruler, RulerLayout, RulerSelection, RulerViewport, StitchClip, Track};
use tracing::{debug, info};
use workflow::{MediaKind, MediaRef};

use crate::{Busy, Studio, StudioError};

impl Studio {
    /// Queues `media` of `node_id` (the node's summary media when `None`) on
    /// the matching track and returns where it landed. Video and audio
    /// durations are probed first; a failed probe leaves the tracks untouched.
    pub async fn add_clip(&self, node_id: &str, media: Option<MediaRef>) -> Result<(Track, usize), StudioError> {
        self.queue_clip("Add clip", node_id, media, false).await
    }

    /// Like [`Studio::add_clip`] but into the buffer lane, which is not
    /// stitched until its clips are dragged onto a track.
    pub async fn stage_clip(&self, node_id: &str, media: Option<MediaRef>) -> Result<usize, StudioError> {
        let (_, index) = self.queue_clip("Stage clip", node_id, media, true).await?;
        Ok(index)
    }

    /// Stitched track the node's summary media would land on.
    pub fn clip_track(&self, node_id: &str) -> Option<Track> {
        let kind = self.state.lock().node(node_id)?.media.as_ref()?.kind;
        Some(Track::for_kind(clip_kind(kind)))
    }

    async fn queue_clip(
        &self,
        action: &str,
        node_id: &str,
        media: Option<MediaRef>,
        staged: bool,
    ) -> Result<(Track, usize), StudioError> {
        let media = {
            let state = self.state.lock();
            match state.node(node_id) {
                None => Err(StudioError::UnknownNode(node_id.to_string())),
                Some(node) => media.or_else(|| node.media.clone()).ok_or_else(|| StudioError::ClipRejected {
                    node_id: node_id.to_string(),
                    reason: "node has no media".to_string(),
                }),
            }
        };
        let media = media.map_err(|e| self.fail(action, e))?;

        let track = if staged {
            Track::Buffer
        } else {
            Track::for_kind(clip_kind(media.kind))
        };
        let duplicate = self.state.lock().timeline.contains(track, node_id);
        if duplicate {
            return Err(self.fail(
                action,
                StudioError::ClipRejected {
                    node_id: node_id.to_string(),
                    reason: format!("already on the {track} track"),
                },
            ));
        }

        let url = media.url(self.config.media_base());
        debug!(node_id, %url, kind = ?media.kind, %track, "adding clip");
        let clip = match media.kind {
            MediaKind::Image => StitchClip::image(node_id, &media.path, &url, self.config.default_image_duration)
                .map_err(StudioError::from),
            MediaKind::Video => match self.probe.duration(&url).await {
                Ok(total) => StitchClip::video(node_id, &media.path, &url, total).map_err(StudioError::from),
                Err(e) => Err(e.into()),
            },
            MediaKind::Audio => match self.probe.duration(&url).await {
                Ok(duration) => StitchClip::audio(node_id, &media.path, &url, duration).map_err(StudioError::from),
                Err(e) => Err(e.into()),
            },
        };
        let pushed = clip.and_then(|clip| {
            let mut state = self.state.lock();
            let pushed = if staged {
                state.timeline.stage(clip)
            } else {
                state.timeline.push(clip)
            };
            pushed.map_err(StudioError::from)
        });
        let index = pushed.map_err(|e| self.fail(action, e))?;
        self.set_status(format!("Clip added to the {track} track."));
        Ok((track, index))
    }

    pub fn remove_clip(&self, track: Track, index: usize) -> Result<StitchClip, StudioError> {
        let removed = self.state.lock().timeline.remove(track, index);
        removed.map_err(|e| self.fail("Remove clip", e.into()))
    }

    /// Trims a video clip to `[start, end]` of its source. Other clip kinds
    /// are rejected.
    pub fn trim_clip(&self, track: Track, index: usize, start: f64, end: f64) -> Result<(), StudioError> {
        let trimmed = self
            .state
            .lock()
            .timeline
            .edit(track, index, |clip| clip.set_trim(start, end));
        trimmed.map_err(|e| self.fail("Trim clip", e.into()))
    }

    /// Display length of an image clip.
    pub fn set_clip_duration(&self, track: Track, index: usize, duration: f64) -> Result<(), StudioError> {
        let set = self
            .state
            .lock()
            .timeline
            .edit(track, index, |clip| clip.set_duration(duration));
        set.map_err(|e| self.fail("Set clip duration", e.into()))
    }

    pub fn clear_clips(&self) {
        self.state.lock().timeline.clear();
    }

    pub fn begin_drag(&self, track: Track, index: usize) {
        self.state.lock().drag.start(track, index);
    }

    pub fn hover_clip(&self, track: Track, index: usize) {
        self.state.lock().drag.hover_item(track, index);
    }

    pub fn leave_clip(&self) {
        self.state.lock().drag.leave_item();
    }

    pub fn hover_track(&self, track: Track) {
        self.state.lock().drag.hover_container(track);
    }

    pub fn leave_track(&self) {
        self.state.lock().drag.leave_container();
    }

    /// Drops the dragged clip onto the clip at `target`: a reorder within one
    /// track, or a move out of the buffer. Returns whether anything moved.
    pub fn drop_on_clip(&self, track: Track, target: usize) -> bool {
        self.drop_clip(track, Some(target))
    }

    /// Drops the dragged clip onto empty track space, moving it last.
    pub fn drop_on_track(&self, track: Track) -> bool {
        self.drop_clip(track, None)
    }

    fn drop_clip(&self, track: Track, target: Option<usize>) -> bool {
        let moved = {
            let mut state = self.state.lock();
            let Some(transfer) = state.drag.take_transfer(track, target) else {
                let current = state.timeline.track(track).to_vec();
                let order = match target {
                    Some(target) => state.drag.drop_on_item(track, target, &current),
                    None => state.drag.drop_on_container(track, &current),
                };
                return adopt(&mut state, track, order);
            };
            state.timeline.transfer(transfer.from, transfer.to, transfer.at)
        };
        match moved {
            Ok(index) => {
                self.set_status(format!("Clip moved to the {track} track."));
                debug!(%track, index, "buffered clip placed");
                true
            }
            Err(e) => {
                self.fail("Move clip", e.into());
                false
            }
        }
    }

    /// Drag end, dropped or not.
    pub fn end_drag(&self) {
        self.state.lock().drag.end();
    }

    pub fn zoom_timeline(&self, delta_y: f64) -> f64 {
        let mut state = self.state.lock();
        state.zoom.wheel(delta_y);
        state.zoom.pixels_per_second()
    }

    /// Ruler over the longer of the two tracks.
    pub fn ruler(&self, viewport: RulerViewport, selection: Option<RulerSelection>) -> RulerLayout {
        let state = self.state.lock();
        let total = state
            .timeline
            .total_duration(Track::Video)
            .max(state.timeline.total_duration(Track::Audio));
        layout_ruler(state.zoom, total, viewport, selection)
    }

    /// Posts the queued clips and returns the stitched output URL, which also
    /// opens in the preview.
    pub async fn request_stitch(&self) -> Result<String, StudioError> {
        let request = self.state.lock().timeline.request();
        let request = request.map_err(|e| self.fail("Stitch", e.into()))?;
        let _busy = self.busy(Busy::Stitching);
        self.set_status(format!("Stitching {} clips...", request.clips.len()));
        let response = self
            .backend
            .stitch(&request)
            .await
            .map_err(|e| self.fail("Stitch", e.into()))?;
        let url = workflow::resolve_media_url(self.config.media_base(), &response.output_url);
        info!(%url, "stitch finished");
        {
            let mut state = self.state.lock();
            state.last_output_url = Some(url.clone());
            state.status = "Stitching finished.".to_string();
        }
        self.open_preview(url.clone(), MediaKind::Video);
        Ok(url)
    }
}

fn clip_kind(kind: MediaKind) -> timeline::ClipKind {
    match kind {
        MediaKind::Image => timeline::ClipKind::Image,
        MediaKind::Video => timeline::ClipKind::Video,
        MediaKind::Audio => timeline::ClipKind::Audio,
    }
}

fn adopt(state: &mut crate::StudioState, track: Track, order: Option<Vec<StitchClip>>) -> bool {
    let Some(order) = order else {
        return false;
    };
    match state.timeline.adopt(track, order) {
        Ok(()) => {
            debug!(%track, "clips reordered");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "reorder dropped");
            false
        }
    }
}
