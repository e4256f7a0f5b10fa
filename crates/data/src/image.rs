use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use tokio::fs;

pub fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

pub fn is_image(path: &Path) -> bool {
    image_mime(path).is_some()
}

/// File stem with `-` and `_` turned into spaces: `la_sirena.png` -> `la sirena`.
pub fn card_name_from_file(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(&['-', '_'][..], " "))
        .unwrap_or_default()
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub async fn load_image_data_uri(path: &Path) -> anyhow::Result<String> {
    let Some(mime) = image_mime(path) else {
        bail!("{} is not a supported image", path.display());
    };
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    Ok(encode_data_uri(mime, &bytes))
}

/// Image files directly inside `dir`, sorted by name.
pub async fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("read {}", dir.display()))?;
    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("read {}", dir.display()))?
    {
        let path = entry.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
