use serde::Serialize;

pub const DEFAULT_PIXELS_PER_SECOND: f64 = 40.0;
pub const MIN_PIXELS_PER_SECOND: f64 = 10.0;
pub const MAX_PIXELS_PER_SECOND: f64 = 800.0;

const MIN_VIDEO_CLIP_WIDTH: f64 = 50.0;
const MIN_AUDIO_CLIP_WIDTH: f64 = 30.0;

const MAJOR_TARGET_PX: f64 = 80.0;
const MAJOR_STEPS: [f64; 12] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0,
];
const MINOR_PER_MAJOR: u32 = 4;
const SUB_MINOR_STEP: f64 = 0.02;
const SUB_MINOR_MIN_PX: f64 = 4.0;
const EPS: f64 = 1e-6;

/// Horizontal scale of the stitch timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineZoom {
    pixels_per_second: f64,
}

impl Default for TimelineZoom {
    fn default() -> Self {
        Self {
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
        }
    }
}

impl TimelineZoom {
    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    /// Wheel step: scrolling down shrinks by 10%, up grows by 10%.
    pub fn wheel(&mut self, delta_y: f64) {
        let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
        self.pixels_per_second =
            (self.pixels_per_second * factor).clamp(MIN_PIXELS_PER_SECOND, MAX_PIXELS_PER_SECOND);
    }

    pub fn video_clip_width(&self, duration: f64) -> f64 {
        (duration.max(0.0) * self.pixels_per_second).max(MIN_VIDEO_CLIP_WIDTH)
    }

    pub fn audio_clip_width(&self, duration: f64) -> f64 {
        (duration.max(0.0) * self.pixels_per_second).max(MIN_AUDIO_CLIP_WIDTH)
    }
}

/// `12.3s` below a minute, `mm:ss` from there on.
pub fn format_time(seconds: f64) -> String {
    let s = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    if s < 60.0 {
        return format!("{s:.1}s");
    }
    let minutes = (s / 60.0).floor();
    let remain = (s - minutes * 60.0).round();
    format!("{:02}:{:02}", minutes as u64, remain as u64)
}

/// The candidate step whose on-screen spacing lies closest to 80 px.
pub fn pick_major_step(pixels_per_second: f64) -> f64 {
    let mut best = MAJOR_STEPS[0];
    let mut best_diff = f64::INFINITY;
    for step in MAJOR_STEPS {
        let diff = (step * pixels_per_second - MAJOR_TARGET_PX).abs();
        if diff < best_diff {
            best_diff = diff;
            best = step;
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Major,
    Minor,
    SubMinor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub kind: TickKind,
    pub time: f64,
    pub x: f64,
    /// Set on major ticks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Highlighted range dragged out on the ruler, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RulerSelection {
    pub start_px: f64,
    pub end_px: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulerLayout {
    pub width: f64,
    pub major_step: f64,
    pub ticks: Vec<Tick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<RulerSelection>,
}

/// Where the ruler sits on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerViewport {
    pub width: f64,
    pub scroll_left: f64,
}

impl Default for RulerViewport {
    fn default() -> Self {
        Self {
            width: 300.0,
            scroll_left: 0.0,
        }
    }
}

/// Lays out the ruler for the visible window, padded by 10% on both sides.
/// `total_duration` is the longer of the two tracks.
pub fn layout_ruler(
    zoom: TimelineZoom,
    total_duration: f64,
    viewport: RulerViewport,
    selection: Option<RulerSelection>,
) -> RulerLayout {
    let pps = zoom.pixels_per_second();
    let min_visible = viewport.width / pps;
    let effective = total_duration.max(0.0).max(min_visible);
    let width = viewport.width.max(effective * pps);

    let visible_start = viewport.scroll_left / pps;
    let visible_end = (viewport.scroll_left + viewport.width) / pps;
    let pad = (visible_end - visible_start) * 0.1;
    let t_start = (visible_start - pad).max(0.0);
    let t_end = (visible_end + pad).min(effective);

    let major = pick_major_step(pps);
    let minor = major / f64::from(MINOR_PER_MAJOR + 1);
    let mut ticks = Vec::new();

    let mut index = (t_start / major).floor().max(0.0) as u64;
    loop {
        let t = index as f64 * major;
        if t > t_end + EPS {
            break;
        }
        ticks.push(Tick {
            kind: TickKind::Major,
            time: t,
            x: t * pps,
            label: Some(format_time(t)),
        });
        for i in 1..=MINOR_PER_MAJOR {
            let tm = t + f64::from(i) * minor;
            if tm > t_end + EPS {
                break;
            }
            if tm < t_start - EPS {
                continue;
            }
            ticks.push(Tick {
                kind: TickKind::Minor,
                time: tm,
                x: tm * pps,
                label: None,
            });
        }
        index += 1;
    }

    if major <= 1.0 && pps * SUB_MINOR_STEP >= SUB_MINOR_MIN_PX {
        let mut index = (t_start / SUB_MINOR_STEP - EPS).ceil().max(0.0) as u64;
        loop {
            let ts = index as f64 * SUB_MINOR_STEP;
            if ts > t_end + EPS {
                break;
            }
            index += 1;
            if on_grid(ts, major) || on_grid(ts, minor) {
                continue;
            }
            ticks.push(Tick {
                kind: TickKind::SubMinor,
                time: ts,
                x: ts * pps,
                label: None,
            });
        }
    }

    let selection = selection.and_then(|sel| {
        let lo = sel.start_px.min(sel.end_px).max(0.0);
        let hi = sel.start_px.max(sel.end_px).min(width);
        (sel.start_px != sel.end_px && hi > lo).then_some(RulerSelection {
            start_px: lo,
            end_px: hi,
        })
    });

    RulerLayout {
        width,
        major_step: major,
        ticks,
        selection,
    }
}

fn on_grid(t: f64, step: f64) -> bool {
    let q = t / step;
    (q - q.round()).abs() < 1e-3
}
