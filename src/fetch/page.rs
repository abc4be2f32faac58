// src/fetch/page.rs
use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Refuse URLs whose host is not one of `allowed` (or a subdomain of one).
/// An empty list allows everything.
pub fn ensure_allowed(url: &Url, allowed: &[String]) -> Result<()> {
    if allowed.is_empty() {
        return Ok(());
    }
    let Some(host) = url.host_str() else {
        bail!("{} has no host", url);
    };
    let ok = allowed.iter().any(|d| {
        let d = d.trim().trim_start_matches('.');
        host.eq_ignore_ascii_case(d)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", d.to_ascii_lowercase()))
    });
    if !ok {
        bail!("host {} is not in allowed domains {:?}", host, allowed);
    }
    Ok(())
}

/// GET the rate page and return its body.
pub async fn fetch_page(client: &Client, url: &Url, allowed: &[String]) -> Result<String> {
    ensure_allowed(url, allowed)?;
    debug!("Fetching rate page {}", url);
    let body = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))?;
    debug!(bytes = body.len(), "page fetched");
    Ok(body)
}
