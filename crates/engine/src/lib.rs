//! Gallery directory lister.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use inkfolio_core::{IMAGE_EXTENSIONS, ImageDescriptor, ImageSource, UNNUMBERED_SORT_KEY};

#[derive(Debug, Clone)]
pub struct ImageLister {
    dir: PathBuf,
    public_prefix: String,
}

impl ImageLister {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// URL prefix under which listed images are served.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Lists gallery images ordered by their numeric filename prefix.
    ///
    /// Fails when the directory cannot be read. Entries are read in name
    /// order first so that files sharing a sort key keep a stable order
    /// regardless of what the filesystem returns.
    pub fn list(&self) -> anyhow::Result<Vec<ImageDescriptor>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("read dir {}", self.dir.display()))?
        {
            let entry = entry.with_context(|| format!("read entry in {}", self.dir.display()))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_image(&name) {
                names.push(name);
            }
        }
        names.sort();
        names.sort_by_key(|name| sort_key(name));

        log::debug!("listed {} images in {}", names.len(), self.dir.display());

        Ok(names
            .into_iter()
            .map(|filename| ImageDescriptor {
                display_name: display_name(&filename),
                path: public_path(&self.public_prefix, &filename),
                filename,
            })
            .collect())
    }
}

impl ImageSource for ImageLister {
    fn list_images(&self) -> anyhow::Result<Vec<ImageDescriptor>> {
        self.list()
    }

    fn load_image(&self, image: &ImageDescriptor) -> anyhow::Result<Vec<u8>> {
        // Fallback descriptors come from config and may name any path.
        if image.filename.contains(['/', '\\']) || image.filename == ".." {
            anyhow::bail!("refusing to load {:?} outside the gallery", image.filename);
        }
        let path = self.dir.join(&image.filename);
        fs::read(&path).with_context(|| format!("read image {}", path.display()))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

pub fn is_image(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Leading number of the part before the first `_`, or
/// [`UNNUMBERED_SORT_KEY`] when there is none.
///
/// A number too large for `u64` sorts last rather than among the
/// unnumbered files.
pub fn sort_key(filename: &str) -> u64 {
    let head = filename.split('_').next().unwrap_or_default();
    let digits: &str = match head.find(|c: char| !c.is_ascii_digit()) {
        Some(end) => &head[..end],
        None => head,
    };
    if digits.is_empty() {
        return UNNUMBERED_SORT_KEY;
    }
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// `3_Dragon_Tattoo.png` becomes `Dragon Tattoo`.
pub fn display_name(filename: &str) -> String {
    let mut name = filename;

    let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && name[digits..].starts_with('_') {
        name = &name[digits + 1..];
    }

    if let Some(dot) = name.rfind('.')
        && dot + 1 < name.len()
    {
        name = &name[..dot];
    }

    name.replace('_', " ")
}

pub fn public_path(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lister_with(names: &[&str]) -> (tempfile::TempDir, ImageLister) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let lister = ImageLister::new(dir.path(), "/images");
        (dir, lister)
    }

    fn filenames(images: &[ImageDescriptor]) -> Vec<&str> {
        images.iter().map(|i| i.filename.as_str()).collect()
    }

    #[test]
    fn display_name_strips_prefix_and_extension() {
        assert_eq!(display_name("3_Dragon_Tattoo.png"), "Dragon Tattoo");
        assert_eq!(display_name("notanumber.jpg"), "notanumber");
        assert_eq!(display_name("12_koi.fish.webp"), "koi.fish");
        assert_eq!(display_name("7rose.gif"), "7rose");
    }

    #[test]
    fn sort_key_parses_leading_number() {
        assert_eq!(sort_key("2_x.png"), 2);
        assert_eq!(sort_key("10_x.png"), 10);
        assert_eq!(sort_key("5.png"), 5);
        assert_eq!(sort_key("notanumber.jpg"), UNNUMBERED_SORT_KEY);
        assert_eq!(sort_key("_1.jpg"), UNNUMBERED_SORT_KEY);
        assert_eq!(sort_key("5000000000_big.png"), 5_000_000_000);
        assert_eq!(sort_key("99999999999999999999999_huge.png"), u64::MAX);
    }

    #[test]
    fn large_prefixes_sort_after_unnumbered_files() {
        let (_dir, lister) = lister_with(&["5000000000_big.png", "zzz.png", "3_small.png"]);
        let images = lister.list().unwrap();
        assert_eq!(
            filenames(&images),
            vec!["3_small.png", "zzz.png", "5000000000_big.png"]
        );
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_image("a.JPG"));
        assert!(is_image("a.Webp"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("jpg"));
    }

    #[test]
    fn lists_only_images_in_numeric_order() {
        let (_dir, lister) = lister_with(&[
            "1_a.jpg",
            "2_b.png",
            "notanumber.jpg",
            "10_c.webp",
            "3_d.gif",
            "readme.md",
        ]);
        let images = lister.list().unwrap();
        assert_eq!(
            filenames(&images),
            vec!["1_a.jpg", "2_b.png", "3_d.gif", "10_c.webp", "notanumber.jpg"]
        );
        assert_eq!(images[0].path, "/images/1_a.jpg");
        assert_eq!(images[0].display_name, "a");
    }

    #[test]
    fn equal_keys_keep_name_order() {
        let (_dir, lister) = lister_with(&["b.png", "a.png", "4_z.png", "4_y.png"]);
        let images = lister.list().unwrap();
        assert_eq!(filenames(&images), vec!["4_y.png", "4_z.png", "a.png", "b.png"]);
    }

    #[test]
    fn subdirectories_are_skipped() {
        let (dir, lister) = lister_with(&["1_a.png"]);
        fs::create_dir(dir.path().join("2_folder.png")).unwrap();
        assert_eq!(filenames(&lister.list().unwrap()), vec!["1_a.png"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let lister = ImageLister::new(dir.path().join("missing"), "/images");
        let err = lister.list().unwrap_err();
        assert!(format!("{err:#}").contains("read dir"));
    }

    #[test]
    fn load_image_reads_bytes_and_rejects_paths() {
        let (_dir, lister) = lister_with(&["1_a.png"]);
        let images = lister.list_images().unwrap();
        assert_eq!(lister.load_image(&images[0]).unwrap(), b"x");

        let escape = ImageDescriptor {
            filename: "../secret.png".to_string(),
            display_name: "secret".to_string(),
            path: "/images/../secret.png".to_string(),
        };
        assert!(lister.load_image(&escape).is_err());
    }
}
