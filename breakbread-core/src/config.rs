use std::time::Duration;

/// The configuration of the Break Bread client.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long search input must stay unchanged before a request is issued
    pub debounce_in_ms: u64,
    /// The radius around the cached coordinates to search for places, in meters
    pub search_radius_in_meters: u32,
    /// The number of characters in a table invite code
    pub invite_code_length: usize,
    /// The storage bucket table banner images are uploaded to
    pub table_image_bucket: String,
    /// The storage bucket profile avatars are uploaded to
    pub avatar_bucket: String,
    /// The image a newly created table falls back to when no banner is supplied
    pub default_table_image_url: String,
}

impl Config {
    /// How long the search controller waits before firing a scheduled query
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_in_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Enough for typing to settle without the list feeling sluggish
            debounce_in_ms: 400,
            // Roughly walking distance in a dense area
            search_radius_in_meters: 4000,
            invite_code_length: 6,
            table_image_bucket: "table-images".to_string(),
            avatar_bucket: "avatars".to_string(),
            default_table_image_url: "https://via.placeholder.com/600x120.png?text=Table+Image"
                .to_string(),
        }
    }
}
