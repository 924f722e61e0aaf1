//! Application orchestration layer for Inkfolio.

use inkfolio_core::{ImageDescriptor, ImageSource, LayoutMode, Page, Settings};

mod dwell;
mod gesture;
mod pages;
mod sequencer;

pub use dwell::HoverDwell;
pub use gesture::swipe_direction;
pub use pages::build_pages;
pub use sequencer::{
    FlipSequencer, FlipState, FlipTiming, Renderer, Transition, TransitionKind, View, ease_in_out,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    pub images: Vec<ImageDescriptor>,
    /// The source failed or was empty and the fallback gallery is shown.
    pub degraded: bool,
}

/// Fetches the gallery, falling back to `fallback` when the source fails or
/// returns nothing. Failures are logged, never returned.
pub fn load_gallery(source: &dyn ImageSource, fallback: &[ImageDescriptor]) -> Gallery {
    match source.list_images() {
        Ok(images) if !images.is_empty() => {
            log::info!("loaded {} images from {}", images.len(), source.describe());
            Gallery {
                images,
                degraded: false,
            }
        }
        Ok(_) => {
            log::warn!("no images found in {}", source.describe());
            Gallery {
                images: fallback.to_vec(),
                degraded: true,
            }
        }
        Err(err) => {
            log::warn!("failed to load images from {}: {err:#}", source.describe());
            Gallery {
                images: fallback.to_vec(),
                degraded: true,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub source: String,
    pub gallery: Gallery,
}

impl AppContext {
    pub fn new(mut settings: Settings) -> Self {
        settings.normalize();
        Self {
            settings,
            source: String::new(),
            gallery: Gallery {
                images: Vec::new(),
                degraded: false,
            },
        }
    }

    pub fn with_gallery(mut self, source: String, gallery: Gallery) -> Self {
        self.source = source;
        self.gallery = gallery;
        self
    }

    pub fn pages(&self) -> Vec<Page> {
        build_pages(&self.settings.book, &self.gallery.images)
    }

    pub fn sequencer(&self, layout: LayoutMode) -> FlipSequencer {
        FlipSequencer::new(
            self.pages(),
            layout,
            FlipTiming::from_settings(&self.settings),
        )
    }

    pub fn dwell<Z: Copy + PartialEq>(&self) -> HoverDwell<Z> {
        HoverDwell::new(self.settings.dwell_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(anyhow::Result<Vec<ImageDescriptor>>);

    impl ImageSource for FixedSource {
        fn list_images(&self) -> anyhow::Result<Vec<ImageDescriptor>> {
            match &self.0 {
                Ok(images) => Ok(images.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }

        fn load_image(&self, _image: &ImageDescriptor) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("not loaded in tests")
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn image(name: &str) -> ImageDescriptor {
        ImageDescriptor {
            filename: name.to_string(),
            display_name: name.to_string(),
            path: format!("/images/{name}"),
        }
    }

    #[test]
    fn gallery_uses_source_images() {
        let source = FixedSource(Ok(vec![image("1_a.png")]));
        let gallery = load_gallery(&source, &[image("fallback.png")]);
        assert!(!gallery.degraded);
        assert_eq!(gallery.images, vec![image("1_a.png")]);
    }

    #[test]
    fn failed_fetch_falls_back() {
        let source = FixedSource(Err(anyhow::anyhow!("connection refused")));
        let gallery = load_gallery(&source, &[image("fallback.png")]);
        assert!(gallery.degraded);
        assert_eq!(gallery.images, vec![image("fallback.png")]);
    }

    #[test]
    fn empty_fetch_falls_back() {
        let source = FixedSource(Ok(Vec::new()));
        let gallery = load_gallery(&source, &[]);
        assert!(gallery.degraded);
        assert!(gallery.images.is_empty());
    }

    #[test]
    fn context_builds_sequencer_from_settings() {
        let settings = Settings {
            flip_ms: 300,
            ..Settings::default()
        };
        let ctx = AppContext::new(settings).with_gallery(
            "fixed".to_string(),
            Gallery {
                images: vec![image("1_a.png"), image("2_b.png")],
                degraded: false,
            },
        );
        let seq = ctx.sequencer(LayoutMode::Spread);
        assert_eq!(seq.pages().len(), 6);
        assert_eq!(seq.timing().flip_ms, 300);
        assert_eq!(seq.last_position(), 2);
    }
}
