//! Test helpers and fixtures.

use std::path::Path;

use inkfolio_application::{Renderer, Transition, View};
use inkfolio_core::{ImageDescriptor, LayoutPreference, Page, Settings};

pub fn make_settings(flip_ms: u64, dwell_ms: u64) -> Settings {
    Settings {
        flip_ms,
        jump_ms: flip_ms / 2,
        dwell_ms,
        layout: LayoutPreference::Spread,
        ..Settings::default()
    }
}

/// `n` descriptors named `1_Tattoo_1.png`, `2_Tattoo_2.png`, ...
pub fn sample_images(n: usize) -> Vec<ImageDescriptor> {
    (1..=n)
        .map(|i| ImageDescriptor {
            filename: format!("{i}_Tattoo_{i}.png"),
            display_name: format!("Tattoo {i}"),
            path: format!("/images/{i}_Tattoo_{i}.png"),
        })
        .collect()
}

/// Creates `names` as small files under `dir`, making parents as needed.
pub fn write_files(dir: &Path, names: &[&str]) -> anyhow::Result<()> {
    for name in names {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, name.as_bytes())?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Present(View),
    Begin(Transition),
    End(View),
}

/// Renderer that remembers every batch it was asked to draw.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    pub fn begins(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RenderCall::Begin(_)))
            .count()
    }

    pub fn ends(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RenderCall::End(_)))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn present(&mut self, view: &View, _pages: &[Page]) {
        self.calls.push(RenderCall::Present(*view));
    }

    fn begin_transition(&mut self, transition: &Transition, _pages: &[Page]) {
        self.calls.push(RenderCall::Begin(*transition));
    }

    fn end_transition(&mut self, view: &View, _pages: &[Page]) {
        self.calls.push(RenderCall::End(*view));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkfolio_application::{AppContext, load_gallery};
    use inkfolio_core::{Direction, ImageSource as _, LayoutMode, PageKind};
    use inkfolio_engine::ImageLister;
    use inkfolio_server::{HttpImageSource, Server, Site};

    #[test]
    fn builds_settings() {
        let settings = make_settings(600, 900);
        assert_eq!(settings.jump_ms, 300);
        assert_eq!(settings.dwell_ms, 900);
    }

    #[test]
    fn gallery_directory_orders_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                "10_Koi_Fish.jpg",
                "2_Rose.png",
                "Sketch.webp",
                "1_Dragon.jpeg",
                "readme.txt",
            ],
        )
        .unwrap();

        let images = ImageLister::new(dir.path(), "/images").list().unwrap();
        let names: Vec<&str> = images.iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["Dragon", "Rose", "Koi Fish", "Sketch"]);
        assert_eq!(images[2].path, "/images/10_Koi_Fish.jpg");
    }

    #[test]
    fn local_gallery_becomes_a_book() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["1_a.png", "2_b.png", "3_c.png"]).unwrap();
        let lister = ImageLister::new(dir.path(), "/images");

        let gallery = load_gallery(&lister, &[]);
        assert!(!gallery.degraded);
        let ctx = AppContext::new(make_settings(800, 1000))
            .with_gallery(lister.describe(), gallery);

        let pages = ctx.pages();
        assert_eq!(pages.len(), 6);
        assert_eq!(pages[0].kind, PageKind::Cover);
        assert_eq!(pages[1].kind, PageKind::Index);
        assert_eq!(pages[5].kind, PageKind::Contact);
        let links: Vec<usize> = pages[1].content.links.iter().map(|l| l.page).collect();
        assert_eq!(links, vec![2, 3, 4]);

        let mut sequencer = ctx.sequencer(LayoutMode::Spread);
        let mut renderer = RecordingRenderer::default();
        sequencer.start(&mut renderer);
        assert!(sequencer.turn(Direction::Forward, 0, &mut renderer));
        assert!(!sequencer.turn(Direction::Forward, 100, &mut renderer));
        assert!(sequencer.tick(800, &mut renderer));
        assert!(sequencer.turn(Direction::Forward, 900, &mut renderer));
        assert!(sequencer.tick(1700, &mut renderer));
        assert!(!sequencer.turn(Direction::Forward, 1800, &mut renderer));

        assert_eq!(sequencer.label(), "Pages 5-6");
        assert_eq!(renderer.begins(), 2);
        assert_eq!(renderer.ends(), 2);

        let target = sequencer.page_position(links[0]).unwrap();
        assert!(sequencer.jump_to(target, 2000, &mut renderer));
        assert_eq!(sequencer.view().left, Some(2));
    }

    #[test]
    fn dead_service_falls_back_to_configured_gallery() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpImageSource::parse(&format!("http://{addr}")).unwrap();

        let fallback = sample_images(2);
        let gallery = load_gallery(&source, &fallback);
        assert!(gallery.degraded);
        assert_eq!(gallery.images, fallback);
    }

    #[test]
    fn unreadable_gallery_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["index.html"]).unwrap();
        let site = Site::new(dir.path(), ImageLister::new(dir.path().join("images"), "/images"));
        let server = Server::bind("127.0.0.1:0", site).unwrap();
        let addr = server.local_addr().unwrap();
        std::thread::spawn(move || server.run());

        let source = HttpImageSource::parse(&format!("http://{addr}")).unwrap();
        let err = source.list_images().unwrap_err();
        assert!(format!("{err:#}").contains("500"));

        let gallery = load_gallery(&source, &[]);
        assert!(gallery.degraded);
        assert!(gallery.images.is_empty());
    }

    #[test]
    fn served_gallery_matches_local_listing() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &["index.html", "images/2_Rose.png", "images/1_Dragon.png"],
        )
        .unwrap();
        let lister = ImageLister::new(dir.path().join("images"), "/images");
        let local = lister.list().unwrap();

        let server = Server::bind("127.0.0.1:0", Site::new(dir.path(), lister)).unwrap();
        let addr = server.local_addr().unwrap();
        std::thread::spawn(move || server.run());

        let source = HttpImageSource::parse(&format!("http://{addr}")).unwrap();
        let remote = source.list_images().unwrap();
        assert_eq!(remote, local);
        assert_eq!(source.load_image(&remote[0]).unwrap(), b"images/1_Dragon.png");

        let json = serde_json::to_value(inkfolio_core::ImageList { images: remote }).unwrap();
        assert_eq!(json["images"][0]["displayName"], "Dragon");
    }
}
