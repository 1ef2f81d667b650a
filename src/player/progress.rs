// Playlist progress
// Derived on demand from the playlist and the active video; nothing is stored

use crate::player::playlist::Playlist;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    // Position of the active video, 0 when none is active
    pub position: usize,
    pub total: usize,
    // 0.0 ..= 100.0
    pub percentage: f64,
}

impl Progress {
    pub fn derive(playlist: &Playlist, active: Option<&str>) -> Self {
        let total = playlist.len();
        let position = active
            .and_then(|video_id| playlist.get(video_id))
            .map_or(0, |item| item.position);
        let percentage = if total > 0 {
            position as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Progress {
            position,
            total,
            percentage,
        }
    }

    // Gauge ratio, clamped to 0.0 ..= 1.0
    pub fn ratio(&self) -> f64 {
        (self.percentage / 100.0).clamp(0.0, 1.0)
    }
}
