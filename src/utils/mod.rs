use std::path::Path;

/// True iff `text` starts with a lowercase `http://` or `https://` scheme.
pub fn is_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Byte count as `12.3MB`-style text, one decimal at most.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[(&str, u64)] = &[
        ("GB", 1024 * 1024 * 1024),
        ("MB", 1024 * 1024),
        ("KB", 1024),
    ];
    for &(unit, divisor) in UNITS {
        if bytes >= divisor {
            let value = bytes / divisor;
            let decimal = bytes % divisor * 10 / divisor;
            if decimal > 0 {
                return format!("{}.{}{}", value, decimal, unit);
            }
            return format!("{}{}", value, unit);
        }
    }
    format!("{}B", bytes)
}

/// Downloaded file name with its extension removed, for the history list.
pub fn display_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Rewrite the extension of an intermediate container to `container`.
///
/// Merged downloads can be reported with the extension of one of the source
/// streams even though the muxer wrote `container`.
pub fn normalize_container(file_name: &str, container: &str) -> String {
    let path = Path::new(file_name);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(container) => file_name.to_string(),
        Some("webm") | Some("mkv") | None => path
            .with_extension(container)
            .to_string_lossy()
            .into_owned(),
        Some(_) => file_name.to_string(),
    }
}
