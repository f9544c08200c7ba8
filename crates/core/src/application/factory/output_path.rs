// Output path derivation: `<dir>/<YYYYMMDD-HHMMSS>-<file>`

use chrono::{TimeZone, Utc};
use std::path::Path;

/// Prefix the file name of `path` with the UTC timestamp `now_millis`
pub fn prefix_with_timestamp(path: &str, now_millis: i64) -> String {
    let stamp = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .map(|t| t.format("%Y%m%d-%H%M%S").to_string())
        .unwrap_or_else(|| now_millis.to_string());

    let p = Path::new(path);
    let file = p
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    match p.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir
            .join(format!("{}-{}", stamp, file))
            .to_string_lossy()
            .into_owned(),
        None => format!("{}-{}", stamp, file),
    }
}
