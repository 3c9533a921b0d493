//! Per-tile ray statistics, merged once every tile is done.

/// Counters for one tile, or for a whole render once merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub camera_rays: u64,
    pub bounce_rays: u64,
    pub shadow_rays: u64,
    pub escaped_rays: u64,
    pub nan_samples: u64,
    pub paths: u64,
    /// Most scattering events seen on any single path.
    pub longest_path: usize,
}

impl Profile {
    pub fn record_path(&mut self, scattering_events: usize) {
        self.paths += 1;
        self.longest_path = self.longest_path.max(scattering_events);
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            camera_rays: self.camera_rays + other.camera_rays,
            bounce_rays: self.bounce_rays + other.bounce_rays,
            shadow_rays: self.shadow_rays + other.shadow_rays,
            escaped_rays: self.escaped_rays + other.escaped_rays,
            nan_samples: self.nan_samples + other.nan_samples,
            paths: self.paths + other.paths,
            longest_path: self.longest_path.max(other.longest_path),
        }
    }

    /// True if no path scattered more than `max_depth` times.
    pub fn within_depth(&self, max_depth: usize) -> bool {
        self.longest_path <= max_depth
    }

    pub fn log_summary(&self) {
        tracing::info!(
            camera_rays = self.camera_rays,
            bounce_rays = self.bounce_rays,
            shadow_rays = self.shadow_rays,
            escaped_rays = self.escaped_rays,
            nan_samples = self.nan_samples,
            longest_path = self.longest_path,
            "render statistics"
        );
    }
}
