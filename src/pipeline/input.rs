//! Input resolution: turn user-supplied paths, folders and URLs into
//! in-memory `(filename, bytes)` pairs.
//!
//! Filenames matter downstream only for MIME inference and row labels, so a
//! downloaded image is named after the last segment of its URL.

use crate::error::OffersError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions picked up when a directory is given as input.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One image to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    /// Label used for MIME inference and the `arquivo` column.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order, to image sources.
///
/// Files are read as-is, directories expand to their images (see
/// [`list_sample_images`]) and URLs are downloaded. An unreadable file or
/// URL given explicitly aborts resolution; an unreadable image inside a
/// directory is logged and skipped.
pub async fn resolve_inputs(
    inputs: &[String],
    timeout_secs: u64,
) -> Result<Vec<ImageSource>, OffersError> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        if is_url(input) {
            sources.push(download_url(input, timeout_secs).await?);
            continue;
        }

        let path = PathBuf::from(input);
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            sources.extend(read_folder(&path).await?);
        } else {
            sources.push(read_local(&path).await?);
        }
    }
    info!("Resolved {} image(s) from {} input(s)", sources.len(), inputs.len());
    Ok(sources)
}

/// Read every image of a folder, skipping entries that cannot be read.
async fn read_folder(dir: &Path) -> Result<Vec<ImageSource>, OffersError> {
    let owned = dir.to_path_buf();
    let images = tokio::task::spawn_blocking(move || list_sample_images(&owned))
        .await
        .map_err(|e| OffersError::Internal(format!("folder listing task panicked: {e}")))?;

    if images.is_empty() {
        warn!("No .jpg/.jpeg/.png images in {}", dir.display());
    }
    Ok(read_all_skipping_failures(&images).await)
}

async fn read_all_skipping_failures(paths: &[PathBuf]) -> Vec<ImageSource> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        match read_local(path).await {
            Ok(source) => sources.push(source),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    sources
}

/// List `.jpg`, `.jpeg` and `.png` files in `dir`, sorted by path.
///
/// A missing or unreadable directory yields an empty list. Blocking; async
/// callers go through `spawn_blocking`.
pub fn list_sample_images(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    paths.sort();
    paths
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path: &Path) -> Result<ImageSource, OffersError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OffersError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => OffersError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => OffersError::InvalidInput {
            input: path.display().to_string(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageSource { filename, bytes })
}

/// Download an image URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageSource, OffersError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OffersError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            OffersError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            OffersError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(OffersError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| OffersError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(ImageSource {
        filename: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of the URL when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.jpg".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/banner.jpg"));
        assert!(is_url("http://example.com/banner.jpg"));
        assert!(!is_url("/tmp/banner.jpg"));
        assert!(!is_url("banner.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/ofertas/semana-12.png?v=3"),
            "semana-12.png"
        );
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.jpg");
        assert_eq!(filename_from_url("https://example.com/image"), "downloaded.jpg");
    }

    #[test]
    fn sample_listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.jpeg", "notes.txt", "d.gif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = list_sample_images(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn missing_sample_dir_is_empty() {
        assert!(list_sample_images(Path::new("/definitely/not/here")).is_empty());
    }

    #[tokio::test]
    async fn resolve_reads_files_and_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("sample-data");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("2.png"), b"two").unwrap();
        std::fs::write(folder.join("1.jpg"), b"one").unwrap();
        let single = dir.path().join("solo.jpeg");
        std::fs::write(&single, b"solo").unwrap();

        let inputs = vec![
            single.display().to_string(),
            folder.display().to_string(),
        ];
        let sources = resolve_inputs(&inputs, 5).await.unwrap();

        assert_eq!(
            sources,
            vec![
                ImageSource::new("solo.jpeg", b"solo".to_vec()),
                ImageSource::new("1.jpg", b"one".to_vec()),
                ImageSource::new("2.png", b"two".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_folder_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.jpg");
        std::fs::write(&good, b"ok").unwrap();
        let gone = dir.path().join("gone.jpg");

        let sources = read_all_skipping_failures(&[gone, good]).await;
        assert_eq!(sources, vec![ImageSource::new("ok.jpg", b"ok".to_vec())]);
    }

    #[tokio::test]
    async fn folder_with_directory_named_like_image_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("album.jpg")).unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();

        let sources = resolve_inputs(&[dir.path().display().to_string()], 5)
            .await
            .unwrap();
        assert_eq!(sources, vec![ImageSource::new("b.png", b"b".to_vec())]);
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let err = resolve_inputs(&["/definitely/not/a/banner.jpg".to_string()], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, OffersError::FileNotFound { .. }));
    }
}
