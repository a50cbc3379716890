//! Source resolution: normalise direct image references to local files.
//!
//! ## Why download to a temp dir?
//!
//! The analyzer and the vision encoder both need a file-system path for
//! dimension probing and byte-level encoding. Downloading URL references
//! into one shared `TempDir` gives them that path while ensuring cleanup
//! happens automatically when [`ResolvedSources`] is dropped, even if the
//! process panics. Every failure here is per-reference: a dead URL or a
//! missing file becomes an [`ImageFault`] and the rest of the batch
//! proceeds.

use crate::error::ImageFault;
use crate::outline::Provenance;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// One image candidate ready for analysis.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub path: PathBuf,
    pub provenance: Provenance,
}

/// Resolved direct references plus the faults hit along the way.
///
/// Holds the download scratch directory alive until the analysis stage is
/// done with the files.
pub struct ResolvedSources {
    pub sources: Vec<ImageSource>,
    pub faults: Vec<ImageFault>,
    _scratch: Option<TempDir>,
}

/// Check if the reference looks like a URL.
pub fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Resolve direct image references (local paths or URLs) to local files.
pub async fn resolve_image_refs(references: &[String], timeout_secs: u64) -> ResolvedSources {
    let mut sources = Vec::with_capacity(references.len());
    let mut faults = Vec::new();
    let mut scratch: Option<TempDir> = None;

    for reference in references {
        if is_url(reference) {
            if scratch.is_none() {
                scratch = match TempDir::new() {
                    Ok(dir) => Some(dir),
                    Err(e) => {
                        faults.push(ImageFault::Download {
                            url: reference.clone(),
                            detail: format!("cannot create scratch dir: {e}"),
                        });
                        continue;
                    }
                };
            }
            let Some(dir) = scratch.as_ref() else {
                continue;
            };
            match download_image(reference, dir, timeout_secs).await {
                Ok(path) => sources.push(ImageSource {
                    path,
                    provenance: Provenance::DirectUpload,
                }),
                Err(fault) => {
                    warn!("{fault}");
                    faults.push(fault);
                }
            }
        } else {
            let path = PathBuf::from(reference);
            if path.exists() {
                debug!("Resolved local image: {}", path.display());
                sources.push(ImageSource {
                    path,
                    provenance: Provenance::DirectUpload,
                });
            } else {
                warn!("Image not found: {}", path.display());
                faults.push(ImageFault::Unreadable {
                    path,
                    detail: "file not found".into(),
                });
            }
        }
    }

    ResolvedSources {
        sources,
        faults,
        _scratch: scratch,
    }
}

/// Download one URL reference into the scratch directory.
async fn download_image(
    url: &str,
    scratch: &TempDir,
    timeout_secs: u64,
) -> Result<PathBuf, ImageFault> {
    info!("Downloading image: {url}");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ImageFault::Download {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| ImageFault::Download {
        url: url.to_string(),
        detail: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(ImageFault::Download {
            url: url.to_string(),
            detail: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| ImageFault::Download {
        url: url.to_string(),
        detail: e.to_string(),
    })?;

    let filename = extract_filename(url);
    let path = scratch.path().join(filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ImageFault::Download {
            url: url.to_string(),
            detail: format!("failed to write scratch file: {e}"),
        })?;

    debug!("Downloaded to: {}", path.display());
    Ok(path)
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded_image".to_string()
}
