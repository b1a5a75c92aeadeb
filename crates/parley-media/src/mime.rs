use std::path::Path;

const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Media type from a file name's extension; unknown extensions are treated
/// as PNG
pub fn infer_media_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// `{base}/api/files/{collection}/{record_id}/{file}`
pub fn file_url(base_url: &str, collection: &str, record_id: &str, file: &str) -> String {
    format!(
        "{}/api/files/{}/{}/{}",
        base_url.trim_end_matches('/'),
        collection,
        record_id,
        file
    )
}
