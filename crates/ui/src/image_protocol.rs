use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use inkfolio_core::{ImageDescriptor, ImageSource};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};

const MAX_DECODED: usize = 48;
const MAX_PROTOCOLS: usize = 96;

fn term_is_xterm_kitty() -> bool {
    std::env::var("TERM")
        .ok()
        .is_some_and(|term| term.trim().starts_with("xterm-kitty"))
}

fn in_kitty_env() -> bool {
    std::env::var("KITTY_WINDOW_ID")
        .ok()
        .is_some_and(|s| !s.trim().is_empty())
}

fn in_iterm_env() -> bool {
    std::env::var("ITERM_SESSION_ID")
        .ok()
        .is_some_and(|s| !s.trim().is_empty())
        || std::env::var("TERM_PROGRAM")
            .ok()
            .is_some_and(|term| term.contains("iTerm") || term.contains("WezTerm"))
}

fn should_query_stdio() -> bool {
    in_kitty_env() || term_is_xterm_kitty() || in_iterm_env() || std::env::var_os("TMUX").is_some()
}

fn stdio_query_timeout() -> Duration {
    if std::env::var_os("TMUX").is_some() && !in_kitty_env() {
        return Duration::from_millis(300);
    }
    Duration::from_millis(1500)
}

/// Graphics protocol for this terminal, falling back to half blocks.
pub(crate) fn detect_picker() -> Picker {
    let mut picker = if should_query_stdio() {
        let mut options = QueryStdioOptions::default();
        options.timeout = stdio_query_timeout();
        options.text_sizing_protocol = false;
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|err| {
            log::debug!("terminal graphics query failed: {err}");
            Picker::halfblocks()
        })
    } else {
        Picker::halfblocks()
    };
    if !in_iterm_env()
        && (in_kitty_env()
            || picker
                .capabilities()
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty)))
    {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    picker.set_background_color(image::Rgba([253u8, 253u8, 248u8, 255u8]));
    log::info!("image protocol: {}", protocol_label(&picker));
    picker
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}

/// Outcome of one background load, keyed by filename.
pub(crate) struct LoadResult {
    pub filename: String,
    pub image: Result<image::DynamicImage, String>,
}

/// Loads and decodes requested images until either channel closes.
pub(crate) fn load_images(
    source: &dyn ImageSource,
    requests: Receiver<ImageDescriptor>,
    results: Sender<LoadResult>,
) {
    for image in requests {
        let decoded = source
            .load_image(&image)
            .and_then(|bytes| image::load_from_memory(&bytes).map_err(anyhow::Error::from))
            .map_err(|err| format!("{err:#}"));
        let result = LoadResult {
            filename: image.filename,
            image: decoded,
        };
        if results.send(result).is_err() {
            break;
        }
    }
    log::debug!("image loader stopped");
}

/// Decoded gallery images and their encoded forms per cell size. Decoding
/// happens on the loader thread; frames show a placeholder until it lands.
pub(crate) struct ImageCache {
    picker: Picker,
    decoded: HashMap<String, Arc<image::DynamicImage>>,
    protocols: HashMap<(String, u16, u16), ImageProtocol>,
    failed: HashMap<String, String>,
    pending: HashSet<String>,
    loader: Option<(Sender<ImageDescriptor>, Receiver<LoadResult>)>,
}

impl ImageCache {
    pub fn new(picker: Picker) -> Self {
        Self {
            picker,
            decoded: HashMap::new(),
            protocols: HashMap::new(),
            failed: HashMap::new(),
            pending: HashSet::new(),
            loader: None,
        }
    }

    pub fn connect(&mut self, requests: Sender<ImageDescriptor>, results: Receiver<LoadResult>) {
        self.pending.clear();
        self.loader = Some((requests, results));
    }

    /// Drops both channels so the loader thread can finish.
    pub fn disconnect(&mut self) {
        self.loader = None;
        self.pending.clear();
    }

    pub fn protocol_label(&self) -> &'static str {
        protocol_label(&self.picker)
    }

    /// Encoded forms depend on the cell size; decoded images are kept.
    pub fn clear_protocols(&mut self) {
        self.protocols.clear();
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queues `image` for the loader unless it is cached, failed or queued.
    pub fn request(&mut self, image: &ImageDescriptor) {
        let name = &image.filename;
        if self.decoded.contains_key(name)
            || self.failed.contains_key(name)
            || self.pending.contains(name)
        {
            return;
        }
        let Some((requests, _)) = &self.loader else {
            return;
        };
        if requests.send(image.clone()).is_err() {
            log::warn!("image loader is gone, cannot load {name}");
            self.failed.insert(name.clone(), "image loader stopped".to_string());
            return;
        }
        self.pending.insert(name.clone());
    }

    /// Takes finished loads. Returns whether any arrived.
    pub fn poll(&mut self) -> bool {
        let Some((_, results)) = &self.loader else {
            return false;
        };
        let finished: Vec<LoadResult> = results.try_iter().collect();
        let arrived = !finished.is_empty();
        for result in finished {
            self.pending.remove(&result.filename);
            match result.image {
                Ok(decoded) => {
                    if self.decoded.len() >= MAX_DECODED {
                        self.decoded.clear();
                    }
                    self.decoded.insert(result.filename, Arc::new(decoded));
                }
                Err(err) => {
                    log::warn!("cannot load {}: {err}", result.filename);
                    self.failed.insert(result.filename, err);
                }
            }
        }
        arrived
    }

    /// Draws `image` fitted into `area`, or a placeholder while it loads or
    /// when it cannot be shown.
    pub fn draw(&mut self, frame: &mut ratatui::Frame, area: Rect, image: &ImageDescriptor) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let key = (image.filename.clone(), area.width, area.height);
        if !self.protocols.contains_key(&key) {
            let Some(decoded) = self.decoded.get(&image.filename).map(Arc::clone) else {
                self.request(image);
                let label = if self.pending.contains(&image.filename) {
                    format!("loading {}", image.display_name)
                } else {
                    image.display_name.clone()
                };
                draw_placeholder(frame, area, &label);
                return;
            };
            let size = Rect::new(0, 0, area.width, area.height);
            match self
                .picker
                .new_protocol((*decoded).clone(), size, Resize::Fit(None))
            {
                Ok(protocol) => {
                    if self.protocols.len() >= MAX_PROTOCOLS {
                        self.protocols.clear();
                    }
                    self.protocols.insert(key.clone(), protocol);
                }
                Err(err) => {
                    log::warn!("cannot encode {}: {err}", image.filename);
                    draw_placeholder(frame, area, &image.display_name);
                    return;
                }
            }
        }
        if let Some(protocol) = self.protocols.get(&key) {
            frame.render_widget(ImageWidget::new(protocol), area);
        }
    }
}

fn draw_placeholder(frame: &mut ratatui::Frame, area: Rect, name: &str) {
    let top = area.height / 2;
    let area = Rect {
        y: area.y + top,
        height: area.height - top,
        ..area
    };
    let text = Paragraph::new(format!("[{name}]"))
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::DIM))
        .wrap(Wrap { trim: true });
    frame.render_widget(text, area);
}
