//! A tiny local site for exercising the HTTP transport end to end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};

/// Canned pages keyed by path, plus a log of every path requested.
#[derive(Default)]
pub struct Site {
    pages: HashMap<String, String>,
    hits: Mutex<Vec<String>>,
}

impl Site {
    pub fn page(mut self, path: &str, body: impl Into<String>) -> Self {
        self.pages.insert(path.to_string(), body.into());
        self
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn serve(State(site): State<Arc<Site>>, uri: Uri) -> (StatusCode, String) {
    let path = uri.path().to_string();
    site.hits.lock().unwrap().push(path.clone());
    match site.pages.get(&path) {
        Some(body) => (StatusCode::OK, body.clone()),
        None => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

/// Serve `site` on an ephemeral localhost port, returning its base URL.
pub async fn spawn_site(site: Site) -> (String, Arc<Site>) {
    let site = Arc::new(site);
    let app = Router::new().fallback(serve).with_state(Arc::clone(&site));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/"), site)
}

/// An address with nothing listening on it.
pub async fn closed_addr() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A Metacritic-style series page.
pub fn metacritic_page(year: i32, critic: &str, reviews: u32) -> String {
    format!(
        r#"<html><body>
        <div data-testid="hero-metadata"><ul><li><span>{year}</span></li></ul></div>
        <div data-testid="critic-score-info">
          <div class="c-siteReviewScore"><span>{critic}</span></div>
          <a data-testid="critic-path">Based on {reviews} Critic Reviews</a>
        </div>
        <div data-testid="user-score-info">
          <div class="c-siteReviewScore"><span>8.1</span></div>
          <a data-testid="user-path">Based on 2,048 User Ratings</a>
        </div>
        </body></html>"#
    )
}
