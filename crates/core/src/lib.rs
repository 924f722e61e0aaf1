//! Core domain types for Inkfolio.

use serde::{Deserialize, Serialize};

mod settings;

pub use settings::{BookText, LayoutPreference, Settings};

pub const DEFAULT_PORT: u16 = 3000;

/// Extensions served as gallery images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Sort key of a file whose name has no leading number.
pub const UNNUMBERED_SORT_KEY: u64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub filename: String,
    pub display_name: String,
    pub path: String,
}

/// Body of `GET /api/images`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageList {
    pub images: Vec<ImageDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

/// Where the viewer gets its gallery from.
pub trait ImageSource: Send + Sync {
    fn list_images(&self) -> anyhow::Result<Vec<ImageDescriptor>>;

    /// Raw encoded bytes of one listed image.
    fn load_image(&self, image: &ImageDescriptor) -> anyhow::Result<Vec<u8>>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Cover,
    /// Showpiece and table of contents facing the cover.
    Index,
    Gallery,
    Contact,
    Blank,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Cover => "cover",
            PageKind::Index => "index",
            PageKind::Gallery => "gallery",
            PageKind::Contact => "contact",
            PageKind::Blank => "blank",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the index page pointing at another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub label: String,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageContent {
    pub heading: String,
    pub body: Vec<String>,
    pub image: Option<ImageDescriptor>,
    pub links: Vec<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub kind: PageKind,
    pub content: PageContent,
}

impl Page {
    pub fn blank(index: usize) -> Self {
        Self {
            index,
            kind: PageKind::Blank,
            content: PageContent::default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind == PageKind::Blank
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many pages are on screen at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Single,
    Spread,
    /// A spread plus the pages lying underneath each side.
    FourSlot,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Single => "single",
            LayoutMode::Spread => "spread",
            LayoutMode::FourSlot => "four",
        }
    }

    pub fn pages_per_position(&self) -> usize {
        match self {
            LayoutMode::Single => 1,
            LayoutMode::Spread | LayoutMode::FourSlot => 2,
        }
    }

    /// Number of navigable positions for a page list of `page_count` pages.
    pub fn position_count(&self, page_count: usize) -> usize {
        page_count.div_ceil(self.pages_per_position())
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_serializes_camel_case() {
        let image = ImageDescriptor {
            filename: "3_Dragon_Tattoo.png".to_string(),
            display_name: "Dragon Tattoo".to_string(),
            path: "/images/3_Dragon_Tattoo.png".to_string(),
        };
        let json = serde_json::to_value(ImageList {
            images: vec![image],
        })
        .unwrap();
        assert_eq!(json["images"][0]["displayName"], "Dragon Tattoo");
        assert_eq!(json["images"][0]["filename"], "3_Dragon_Tattoo.png");
    }

    #[test]
    fn position_count_rounds_up_for_spreads() {
        assert_eq!(LayoutMode::Spread.position_count(6), 3);
        assert_eq!(LayoutMode::Spread.position_count(7), 4);
        assert_eq!(LayoutMode::FourSlot.position_count(0), 0);
        assert_eq!(LayoutMode::Single.position_count(7), 7);
    }

    #[test]
    fn direction_displays_lowercase() {
        assert_eq!(Direction::Forward.to_string(), "forward");
        assert_eq!(Direction::Backward.to_string(), "backward");
    }

    #[test]
    fn blank_page_has_no_content() {
        let page = Page::blank(4);
        assert!(page.is_blank());
        assert_eq!(page.index, 4);
        assert!(page.content.image.is_none());
    }
}
