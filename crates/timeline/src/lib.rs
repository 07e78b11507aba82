//! Stitch timeline: the clip sequence assembled from generated media, the
//! drag-reorder interaction over it and the pixel-per-second ruler.
//!
//! Everything here is pure state; I/O (probing durations, posting the stitch
//! request) lives with the callers.
use thiserror::Error;

mod clip;
pub use clip::*;
mod sequence;
pub use sequence::*;
mod drag;
pub use drag::*;
mod ruler;
pub use ruler::*;

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("clip for node {0} is already on the {1} track")]
    DuplicateClip(String, Track),
    #[error("clip index {index} out of range for {track} track of length {len}")]
    IndexOutOfRange {
        track: Track,
        index: usize,
        len: usize,
    },
    #[error("invalid trim: start {start} end {end} total {total}")]
    InvalidTrim { start: f64, end: f64, total: f64 },
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
    #[error("clip kind {0:?} cannot carry this edit")]
    WrongKind(ClipKind),
    #[error("a {kind:?} clip cannot go on the {track} track")]
    WrongTrack { kind: ClipKind, track: Track },
    #[error("reordered {0} track does not contain the same clips")]
    InvalidOrder(Track),
    #[error("no clips queued on the video track")]
    NoClips,
}
