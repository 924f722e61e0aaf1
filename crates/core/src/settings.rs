use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PORT, ImageDescriptor, LayoutMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    /// Directory served as the static site; holds `index.html`.
    pub site_root: String,
    /// Gallery directory. Relative paths resolve against `site_root`.
    pub images_dir: String,
    /// URL prefix under which gallery files are reachable.
    pub public_prefix: String,
    pub flip_ms: u64,
    pub jump_ms: u64,
    pub dwell_ms: u64,
    /// Minimum horizontal drag, in terminal columns, that counts as a swipe.
    pub swipe_threshold: u16,
    /// Below this terminal width `auto` layout shows one page at a time.
    pub single_page_max_width: u16,
    pub layout: LayoutPreference,
    pub book: BookText,
    /// Shown when the gallery cannot be fetched.
    pub fallback_gallery: Vec<ImageDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPreference {
    Auto,
    Single,
    Spread,
    Four,
}

impl LayoutPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutPreference::Auto => "auto",
            LayoutPreference::Single => "single",
            LayoutPreference::Spread => "spread",
            LayoutPreference::Four => "four",
        }
    }

    pub fn resolve(&self, width: u16, single_page_max_width: u16) -> LayoutMode {
        match self {
            LayoutPreference::Auto => {
                if width <= single_page_max_width {
                    LayoutMode::Single
                } else {
                    LayoutMode::Spread
                }
            }
            LayoutPreference::Single => LayoutMode::Single,
            LayoutPreference::Spread => LayoutMode::Spread,
            LayoutPreference::Four => LayoutMode::FourSlot,
        }
    }
}

impl std::fmt::Display for LayoutPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayoutPreference {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LayoutPreference::Auto),
            "single" => Ok(LayoutPreference::Single),
            "spread" => Ok(LayoutPreference::Spread),
            "four" | "four-slot" => Ok(LayoutPreference::Four),
            _ => Err("unknown layout"),
        }
    }
}

/// Fixed text of the cover, index and contact pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookText {
    pub title: String,
    pub subtitle: String,
    pub welcome: Vec<String>,
    pub instruction: String,
    /// Heading of the index page, above the newest piece.
    pub showpiece: String,
    /// Heading of the index page's list of gallery pages.
    pub collection: String,
    /// No contact page is added when empty.
    pub contact: Vec<String>,
}

impl Default for BookText {
    fn default() -> Self {
        Self {
            title: "Ink Stories".to_string(),
            subtitle: "Tattoo Artistry Portfolio".to_string(),
            welcome: vec![
                "Welcome to my collection of body art.".to_string(),
                "Each piece tells a unique story, crafted with passion and precision.".to_string(),
            ],
            instruction: "← Hover over the page edges to turn →".to_string(),
            showpiece: "Most Recent Showpiece".to_string(),
            collection: "Gallery Collection".to_string(),
            contact: vec![
                "Get in touch".to_string(),
                "Bookings and consultations by appointment.".to_string(),
            ],
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            site_root: "site".to_string(),
            images_dir: "images".to_string(),
            public_prefix: "/images".to_string(),
            flip_ms: 800,
            jump_ms: 400,
            dwell_ms: 1000,
            swipe_threshold: 6,
            single_page_max_width: 100,
            layout: LayoutPreference::Auto,
            book: BookText::default(),
            fallback_gallery: Vec::new(),
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.flip_ms = self.flip_ms.clamp(1, 10_000);
        self.jump_ms = self.jump_ms.clamp(1, 10_000);
        self.dwell_ms = self.dwell_ms.clamp(1, 60_000);
        self.swipe_threshold = self.swipe_threshold.max(1);

        self.site_root = self.site_root.trim().to_string();
        if self.site_root.is_empty() {
            self.site_root = ".".to_string();
        }
        self.images_dir = self.images_dir.trim().to_string();
        if self.images_dir.is_empty() {
            self.images_dir = "images".to_string();
        }

        let prefix = self.public_prefix.trim().trim_matches('/');
        self.public_prefix = format!("/{prefix}");

        self.book.contact = self
            .book
            .contact
            .iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
    }

    /// Overrides the configured port with a `PORT` value; ignores values
    /// that do not parse.
    pub fn apply_port_override(&mut self, value: Option<&str>) {
        if let Some(port) = value.and_then(|v| v.trim().parse::<u16>().ok()) {
            self.port = port;
        }
    }

    /// Gallery directory with relative paths resolved against the site root.
    pub fn images_path(&self) -> std::path::PathBuf {
        let images = std::path::Path::new(&self.images_dir);
        if images.is_absolute() {
            images.to_path_buf()
        } else {
            std::path::Path::new(&self.site_root).join(images)
        }
    }
}
