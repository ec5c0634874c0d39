use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Canned answer for one request target (path plus query).
#[derive(Debug, Clone)]
pub enum Reply {
    Html(String),
    Bytes(Vec<u8>),
    Redirect(String),
    Status(u16),
}

/// Local catalog site served by tiny_http. Unknown targets answer 404.
pub struct SiteStub {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SiteStub {
    pub fn spawn(routes: HashMap<String, Reply>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/");
        let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let server_hits = Arc::clone(&hits);
        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let target = request.url().to_string();
            *server_hits
                .lock()
                .expect("hits lock")
                .entry(target.clone())
                .or_default() += 1;

            let response = match routes.get(&target) {
                Some(Reply::Html(body)) => tiny_http::Response::from_string(body.clone())
                    .with_header(header("Content-Type", "text/html; charset=utf-8")),
                Some(Reply::Bytes(body)) => tiny_http::Response::from_data(body.clone())
                    .with_header(header("Content-Type", "application/octet-stream")),
                Some(Reply::Redirect(location)) => tiny_http::Response::from_string("")
                    .with_status_code(302)
                    .with_header(header("Location", location)),
                Some(Reply::Status(code)) => {
                    tiny_http::Response::from_string("error").with_status_code(*code)
                }
                None => tiny_http::Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        });

        Self {
            base_url,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Number of requests received for `target` (path plus query).
    pub fn hits(&self, target: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(target)
            .copied()
            .unwrap_or(0)
    }

    /// Number of requests whose target starts with `prefix`.
    pub fn hits_with_prefix(&self, prefix: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|(target, _)| target.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn header(name: &str, value: &str) -> tiny_http::Header {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("build header")
}

/// Catalog page with one `table.d_book` row per book id.
pub fn catalog_page(book_ids: &[u64]) -> String {
    let rows: String = book_ids
        .iter()
        .map(|id| {
            format!(
                r#"<table class="d_book"><tr><td><a href="/b{id}/"><img src="/shots/{id}.jpg"></a></td></tr>
<tr><td><b><a href="/b{id}/" title="book {id}">Book {id}</a></b></td></tr></table>"#
            )
        })
        .collect();
    format!("<!DOCTYPE html><html><body><div id=\"content\">{rows}</div></body></html>")
}

/// Book detail page with the given heading and a relative cover link.
pub fn book_page(heading: &str, cover: &str, comments: &[&str], genres: &[&str]) -> String {
    let comments: String = comments
        .iter()
        .map(|c| format!(r#"<div class="texts"><b>Гость</b><span class="black">{c}</span></div>"#))
        .collect();
    let genres: String = genres
        .iter()
        .map(|g| format!(r#"<a href="/l55/">{g}</a> "#))
        .collect();
    format!(
        r##"<!DOCTYPE html><html><body><div id="content">
<h1>{heading}</h1>
<div class="bookimage"><a href="#"><img src="{cover}" alt="cover"></a></div>
<span class="d_book">Жанр книги: {genres}</span>
{comments}
</div></body></html>"##
    )
}
