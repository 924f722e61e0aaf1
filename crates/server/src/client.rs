use std::io::{Read as _, Write as _};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::Context as _;
use inkfolio_core::{ImageDescriptor, ImageList, ImageSource};

use crate::http::{parse_response, percent_encode_path};
use crate::routes::IMAGES_ROUTE;

/// Reads the gallery from a running Inkfolio service.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    authority: String,
    timeout: Duration,
}

impl HttpImageSource {
    /// Accepts `http://host:port` with an optional trailing path.
    pub fn parse(url: &str) -> anyhow::Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("http://")
            .ok_or_else(|| anyhow::anyhow!("only http:// sources are supported: {url}"))?;
        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            anyhow::bail!("missing host in {url}");
        }
        let authority = if authority.contains(':') {
            authority.to_string()
        } else {
            format!("{authority}:80")
        };
        Ok(Self {
            authority,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let mut stream = TcpStream::connect(&self.authority)
            .with_context(|| format!("connect to {}", self.authority))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
            self.authority
        );
        stream
            .write_all(request.as_bytes())
            .with_context(|| format!("send GET {path}"))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .with_context(|| format!("read response for {path}"))?;

        let (status, body) = parse_response(&raw)?;
        if status != 200 {
            anyhow::bail!("GET {path} returned {status}");
        }
        Ok(body)
    }
}

impl ImageSource for HttpImageSource {
    fn list_images(&self) -> anyhow::Result<Vec<ImageDescriptor>> {
        let body = self.get(IMAGES_ROUTE)?;
        let list: ImageList = serde_json::from_slice(&body).context("decode image list")?;
        Ok(list.images)
    }

    fn load_image(&self, image: &ImageDescriptor) -> anyhow::Result<Vec<u8>> {
        self.get(&percent_encode_path(&image.path))
    }

    fn describe(&self) -> String {
        format!("http://{}", self.authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authority_with_default_port() {
        let source = HttpImageSource::parse("http://localhost").unwrap();
        assert_eq!(source.authority(), "localhost:80");
        let source = HttpImageSource::parse("http://127.0.0.1:3000/api/images").unwrap();
        assert_eq!(source.authority(), "127.0.0.1:3000");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(HttpImageSource::parse("https://example.com").is_err());
        assert!(HttpImageSource::parse("http://").is_err());
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpImageSource::parse(&format!("http://{addr}")).unwrap();
        assert!(source.list_images().is_err());
    }
}
