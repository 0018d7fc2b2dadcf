use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use url::Url;

/// File name used when the caller gives no destination.
pub fn default_download_name(image_id: &str) -> PathBuf {
    PathBuf::from(format!("ai-image-{image_id}.jpg"))
}

/// Copies the bytes behind `url` to `dest`. `file://` URLs are read from
/// disk, `http(s)://` URLs are fetched. Returns the byte count written.
pub fn download_image(http: &HttpClient, url: &str, dest: &Path) -> Result<u64> {
    let parsed = Url::parse(url).with_context(|| format!("invalid image url: {url}"))?;
    let bytes = match parsed.scheme() {
        "file" => {
            let source = parsed
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("image url is not a local path: {url}"))?;
            fs::read(&source).with_context(|| format!("failed reading {}", source.display()))?
        }
        "http" | "https" => {
            let response = http
                .get(parsed.as_str())
                .send()
                .with_context(|| format!("download request failed ({url})"))?;
            let status = response.status();
            if !status.is_success() {
                bail!("download failed ({}): {url}", status.as_u16());
            }
            response
                .bytes()
                .context("failed reading downloaded image bytes")?
                .to_vec()
        }
        other => bail!("unsupported image url scheme '{other}': {url}"),
    };

    if let Some(parent) = dest.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, &bytes).with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(bytes.len() as u64)
}
