//! Path mapping for the page directory, plus `.html` fallback.

use std::path::{Path, PathBuf};

use tokio::fs;

/// Page served for `/`.
pub const INDEX_PAGE: &str = "index.html";
/// Page served for `/login`.
pub const LOGIN_PAGE: &str = "login.html";
/// Page served for `/admin` once the session checks out.
pub const ADMIN_PAGE: &str = "admin.html";

/// Map a request path to a file under `root`, or `None` if nothing matches.
///
/// `/` maps to `index.html` and `/name` falls back to `name.html`. Paths with
/// `..`, backslashes or hidden segments never match, and neither does the
/// admin page, which is only reachable through the session check.
pub async fn map_static_path(root: &Path, uri: &str) -> Option<PathBuf> {
    let rel = uri.strip_prefix('/').unwrap_or(uri);

    if rel.is_empty() {
        return Some(root.join(INDEX_PAGE));
    }
    if rel.contains('\\') || rel.split('/').any(|seg| seg.is_empty() || seg.starts_with('.')) {
        return None;
    }

    let candidate = root.join(rel);
    if is_file(&candidate).await {
        return public(root, candidate);
    }

    let html_candidate = root.join(format!("{rel}.html"));
    if is_file(&html_candidate).await {
        return public(root, html_candidate);
    }

    None
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|md| md.is_file())
}

fn public(root: &Path, path: PathBuf) -> Option<PathBuf> {
    let is_admin_page = path
        .strip_prefix(root)
        .ok()
        .and_then(|rel| rel.to_str())
        .is_some_and(|rel| rel.eq_ignore_ascii_case(ADMIN_PAGE));
    (!is_admin_page).then_some(path)
}
