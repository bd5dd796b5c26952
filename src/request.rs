use chrono::Local;
use reqwest::Client;

use crate::{info_time, Error, Result};

/// Requests a page and returns a `Result<String>` containing the HTML.
/// Anything but a success status is an error, so an error page is never parsed as data.
pub(crate) async fn request_page_html(client: &Client, url: &str) -> Result<String> {
    let start_time = Local::now();
    let res = client.get(url).send().await?;

    let status = res.status();
    if !status.is_success() {
        return Err(Error::HttpStatus(status));
    }

    let html = res.text().await?;
    info_time!(start_time, "Fetched {} ({} bytes)", url, html.len());
    Ok(html)
}
