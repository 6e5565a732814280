use std::path::PathBuf;

const APP_PACKAGE: &str = "com.antoniositoe533.safezone";

pub fn parse_file_uri_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.starts_with('/') {
        return Some(PathBuf::from(uri));
    }
    None
}

/// Directory that holds the persisted session store.
pub fn preferred_data_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(custom) = std::env::var("SAFEZONE_DATA_DIR") {
        candidates.push(PathBuf::from(custom));
    }
    candidates.push(PathBuf::from(format!("/data/user/0/{APP_PACKAGE}/files")));
    candidates.push(PathBuf::from(format!("/data/data/{APP_PACKAGE}/files")));

    for dir in candidates {
        if let Ok(meta) = std::fs::metadata(&dir) {
            if meta.is_dir() {
                return dir;
            }
        }
    }
    std::env::temp_dir()
}

/// Display name for a picked media file when the picker gave none.
pub fn media_display_name(uri: &str) -> String {
    let path = parse_file_uri_path(uri);
    path.as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            uri.rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| uri.to_string())
}
