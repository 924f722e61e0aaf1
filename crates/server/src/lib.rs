//! Static site and gallery API over plain HTTP/1.1.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use inkfolio_engine::ImageLister;

mod client;
pub mod http;
pub mod routes;

pub use client::HttpImageSource;

/// What the service serves: a site root and the gallery lister.
#[derive(Debug, Clone)]
pub struct Site {
    pub root: PathBuf,
    pub lister: ImageLister,
}

impl Site {
    pub fn new(root: impl AsRef<Path>, lister: ImageLister) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            lister,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    site: Arc<Site>,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, site: Site) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).context("bind http listener")?;
        Ok(Self {
            listener,
            site: Arc::new(site),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr().context("read listener address")
    }

    /// Serves until the listener fails. Each connection gets its own thread.
    pub fn run(self) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        log::info!("server is running on port {}", addr.port());
        log::info!("visit http://localhost:{} to view the portfolio", addr.port());

        for incoming in self.listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(err) => {
                    log::warn!("accept error: {err}");
                    continue;
                }
            };
            let site = Arc::clone(&self.site);
            std::thread::spawn(move || {
                if let Err(err) = handle_connection(stream, &site) {
                    log::debug!("request error: {err:#}");
                }
            });
        }

        Ok(())
    }
}

fn handle_connection(mut stream: TcpStream, site: &Site) -> anyhow::Result<()> {
    stream
        .set_read_timeout(Some(Duration::from_secs(15)))
        .context("set read timeout")?;

    let req = match http::read_request(&mut stream) {
        Ok(req) => req,
        Err(err) => {
            let response = http::HttpResponse::new(
                400,
                "text/plain; charset=utf-8",
                b"Bad Request".to_vec(),
            );
            http::write_response(&mut stream, &response, true)?;
            return Err(err);
        }
    };

    let response = routes::route(&req, site);
    match response.header("location") {
        Some(location) => log::info!(
            "{} {} -> {} {location}",
            req.method,
            req.path,
            response.status
        ),
        None => log::info!("{} {} -> {}", req.method, req.path, response.status),
    }
    http::write_response(&mut stream, &response, req.method != "HEAD")
        .context("write response")?;
    Ok(())
}
