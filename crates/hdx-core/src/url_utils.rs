//! Turning share links into direct download urls.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::{context::Hdx, dataset::Dataset, object::HdxObject, resource::Resource, HdxResult};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("unable to compile url regex")
}

static GOOGLE_DRIVE_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^https?://drive.google.com/open\?id=([0-9A-Za-z_-]+)$"));
static GOOGLE_SHEETS_URL: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^https?://[^/]+google.com/.*[^0-9A-Za-z_-]([0-9A-Za-z_-]{44})(?:.*gid=([0-9]+))?.*$")
});
static GOOGLE_SHEETS_XLSX_URL: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^https?://[^/]+google.com/.*[^0-9A-Za-z_-]([0-9A-Za-z_-]{33})(?:.*gid=([0-9]+))?.*$")
});
static GOOGLE_FILE_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"https?://drive.google.com/file/d/([0-9A-Za-z_-]+)/.*$"));
static DROPBOX_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^https://www.dropbox.com/s/([0-9a-z]{15})/([^?]+)\?dl=[01]$"));
static CKAN_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(https?://[^/]+)/dataset/([^/]+)(?:/resource/([a-z0-9-]{36}))?$"));

/// Looks up the download url behind a CKAN dataset or resource page. A
/// resource page gives that resource's url, and a dataset page the first
/// resource that has one.
pub fn get_ckan_urls(hdx: &Hdx, dataset_id: &str, resource_id: Option<&str>) -> HdxResult<Option<String>> {
    if let Some(resource_id) = resource_id {
        if let Some(resource) = Resource::read_from_hdx(hdx, resource_id)? {
            if let Some(url) = resource.get_str("url") {
                return Ok(Some(url.to_string()));
            }
        }
    }
    let Some(dataset) = Dataset::read_from_hdx(hdx, dataset_id)? else {
        return Ok(None);
    };
    Ok(dataset
        .get_resources()
        .iter()
        .filter_map(|resource| resource.get_str("url"))
        .find(|url| !url.is_empty())
        .map(String::from))
}

fn direct_url(hdx: &Hdx, url: &str) -> HdxResult<Option<String>> {
    if let Some(caps) = CKAN_URL.captures(url) {
        if let Some(found) = get_ckan_urls(hdx, &caps[2], caps.get(3).map(|m| m.as_str()))? {
            return Ok(Some(found));
        }
    }
    if GOOGLE_DRIVE_URL.is_match(url) {
        if let Some(location) = hdx.remote().redirect_location(url)? {
            return Ok(Some(location));
        }
    }

    let published = url.contains("/pub");
    if let Some(caps) = GOOGLE_SHEETS_URL.captures(url).filter(|_| !published) {
        let mut direct = format!("https://docs.google.com/spreadsheets/d/{}/export?format=csv", &caps[1]);
        if let Some(gid) = caps.get(2) {
            direct.push_str("&gid=");
            direct.push_str(gid.as_str());
        }
        return Ok(Some(direct));
    }
    let file = GOOGLE_FILE_URL
        .captures(url)
        .or_else(|| GOOGLE_SHEETS_XLSX_URL.captures(url));
    if let Some(caps) = file.filter(|_| !published) {
        return Ok(Some(format!("https://drive.google.com/uc?export=download&id={}", &caps[1])));
    }
    if let Some(caps) = DROPBOX_URL.captures(url) {
        return Ok(Some(format!("https://www.dropbox.com/s/{}/{}?dl=1", &caps[1], &caps[2])));
    }
    Ok(None)
}

/// Follows a share link to the url that downloads the file.
///
/// CKAN dataset and resource pages resolve through the API, Google Drive
/// "open" links through their redirect, and Google Sheets, Drive files and
/// Dropbox links are rewritten to their export forms. Anything else, or a
/// link whose lookup fails, is returned unchanged.
pub fn follow_url(hdx: &Hdx, url: &str) -> String {
    match direct_url(hdx, url) {
        Ok(Some(direct)) => {
            debug!("Following {url} to {direct}");
            direct
        }
        Ok(None) => url.to_string(),
        Err(err) => {
            warn!("Unable to follow {url}: {err}");
            url.to_string()
        }
    }
}
