//! Local page server.
//!
//! Serves the render page the browser loads. The page mounts the embeddable
//! workflow viewer component and feeds it the document from the query
//! string, entirely client-side, so the server only ever hands out one
//! static HTML page plus a health endpoint.

use std::sync::Arc;
use std::thread::JoinHandle;

use tiny_http::{Header, Response, Server};

use crate::error::{Error, Result};

const HEALTH_BODY: &str = r#"{"status":"ok","service":"flowsnap render page"}"#;

/// The render page. Query parameters (`workflow`, `dark`, `width`, `height`)
/// are read in the page itself and applied to the viewer element.
const RENDER_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>flowsnap render page</title>
  <script type="module" src="https://cdn.jsdelivr.net/npm/@n8n_io/n8n-demo-component/n8n-demo.bundled.js"></script>
  <style>
    html, body { margin: 0; padding: 0; }
    body.dark { background: #2d2e3a; }
    n8n-demo { display: block; }
  </style>
</head>
<body>
  <script>
    const params = new URLSearchParams(window.location.search);
    const demo = document.createElement('n8n-demo');
    demo.setAttribute('workflow', params.get('workflow') || '{}');
    demo.setAttribute('disableinteractivity', 'true');
    const width = parseInt(params.get('width') || '1920', 10);
    const height = parseInt(params.get('height') || '1080', 10);
    demo.style.width = width + 'px';
    demo.style.height = height + 'px';
    if (params.get('dark') === 'true') {
      document.body.classList.add('dark');
      demo.setAttribute('theme', 'dark');
    }
    document.body.appendChild(demo);
  </script>
</body>
</html>
"#;

/// Background-thread HTTP server bound to loopback. Shuts down on drop.
pub struct PageServer {
    server: Arc<Server>,
    port: u16,
    handle: Option<JoinHandle<()>>,
}

impl PageServer {
    pub fn start(port: u16) -> Result<Self> {
        let server = Server::http(("127.0.0.1", port))
            .map_err(|e| Error::Server(format!("bind 127.0.0.1:{port}: {e}")))?;
        let server = Arc::new(server);

        let handle = std::thread::spawn({
            let server = Arc::clone(&server);
            move || {
                for request in server.incoming_requests() {
                    respond(request);
                }
            }
        });

        tracing::info!(port, "page server listening");
        Ok(Self {
            server,
            port,
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for PageServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond(request: tiny_http::Request) {
    let path = request.url().split('?').next().unwrap_or("/").to_string();

    let response = match path.as_str() {
        "/" => Response::from_string(HEALTH_BODY).with_header(content_type("application/json")),
        "/render" => {
            Response::from_string(RENDER_PAGE).with_header(content_type("text/html; charset=utf-8"))
        }
        _ => Response::from_string("not found")
            .with_status_code(404)
            .with_header(content_type("text/plain")),
    };

    if let Err(e) = request.respond(response) {
        tracing::debug!(error = %e, path, "failed to respond");
    }
}

fn content_type(value: &str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes())
        .expect("static content-type header is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(stream, "GET {path} HTTP/1.0\r\nHost: 127.0.0.1\r\n\r\n").unwrap();
        let mut body = String::new();
        stream.read_to_string(&mut body).unwrap();
        body
    }

    #[test]
    fn serves_health_and_render_page() {
        // Fixed high port; keep distinct from other tests in this binary.
        let server = PageServer::start(49172).unwrap();
        assert_eq!(server.url(), "http://127.0.0.1:49172");

        let health = get(49172, "/");
        assert!(health.contains("200"));
        assert!(health.contains("\"status\":\"ok\""));

        let page = get(49172, "/render?workflow=%7B%7D");
        assert!(page.contains("text/html"));
        assert!(page.contains("n8n-demo"));

        let missing = get(49172, "/nope");
        assert!(missing.contains("404"));
    }

    #[test]
    fn render_page_mounts_the_element_the_backend_captures() {
        assert!(RENDER_PAGE.contains(super::super::chrome::VIEWER_SELECTOR));
    }
}
