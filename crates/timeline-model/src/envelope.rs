//! Volume envelope for clip-audio ducking.

use serde::{Deserialize, Serialize};

/// Piecewise-linear volume curve over a duck window.
///
/// The curve sits at `base_volume` outside `[duck_start, duck_end)`,
/// ramps down to `duck_volume` over `fade_duration`, holds, and ramps
/// back up over the last `fade_duration` of the window. Times are on the
/// timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub duck_start: f64,
    pub duck_end: f64,
    pub fade_duration: f64,
    #[serde(default = "default_base_volume")]
    pub base_volume: f64,
    pub duck_volume: f64,
}

fn default_base_volume() -> f64 {
    1.0
}

/// One corner of an envelope: volume at a timeline instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub time: f64,
    pub volume: f64,
}

impl Envelope {
    /// Length of the duck window.
    pub fn window(&self) -> f64 {
        self.duck_end - self.duck_start
    }

    /// Whether the two ramps fit in the window without overlapping.
    pub fn ramps_fit(&self) -> bool {
        2.0 * self.fade_duration <= self.window()
    }

    /// Volume at timeline time `t`.
    pub fn volume_at(&self, t: f64) -> f64 {
        let fade_in_end = self.duck_start + self.fade_duration;
        let fade_out_start = self.duck_end - self.fade_duration;

        if t <= self.duck_start || t >= self.duck_end {
            self.base_volume
        } else if t < fade_in_end {
            let progress = (t - self.duck_start) / self.fade_duration;
            lerp(self.base_volume, self.duck_volume, progress)
        } else if t < fade_out_start {
            self.duck_volume
        } else {
            // fade_duration > 0 here, otherwise the plateau branch covers t
            let progress = (t - fade_out_start) / self.fade_duration;
            lerp(self.duck_volume, self.base_volume, progress)
        }
    }

    /// The four corners of the curve, in time order.
    ///
    /// Renderers that drive volume with keyframes can interpolate linearly
    /// between these and hold `base_volume` outside them.
    pub fn breakpoints(&self) -> [VolumePoint; 4] {
        [
            VolumePoint {
                time: self.duck_start,
                volume: self.base_volume,
            },
            VolumePoint {
                time: self.duck_start + self.fade_duration,
                volume: self.duck_volume,
            },
            VolumePoint {
                time: self.duck_end - self.fade_duration,
                volume: self.duck_volume,
            },
            VolumePoint {
                time: self.duck_end,
                volume: self.base_volume,
            },
        ]
    }
}

fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress.clamp(0.0, 1.0)
}
