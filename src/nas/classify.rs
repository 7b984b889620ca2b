//! Fixed lookup tables for file kinds.

pub const IMAGE_TYPE_OTHER: &str = "other";
pub const IMAGE_TYPE_FLOOR_PLAN: &str = "floor_plan";

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic", "heif", "svg",
];

/// Checked in order; the first keyword found in the file name wins.
const IMAGE_KEYWORDS: &[(&str, &str)] = &[
    ("grundriss", IMAGE_TYPE_FLOOR_PLAN),
    ("floorplan", IMAGE_TYPE_FLOOR_PLAN),
    ("schlafzimmer", "bedroom"),
    ("kinderzimmer", "bedroom"),
    ("wohnzimmer", "living_room"),
    ("esszimmer", "dining_room"),
    ("kueche", "kitchen"),
    ("badezimmer", "bathroom"),
    ("bad", "bathroom"),
    ("balkon", "balcony"),
    ("terrasse", "terrace"),
    ("garten", "garden"),
    ("fassade", "exterior"),
    ("aussen", "exterior"),
    ("ansicht", "exterior"),
    ("flur", "hallway"),
    ("keller", "basement"),
    ("garage", "garage"),
];

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("zip", "application/zip"),
];

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub fn extension(file_name: &str) -> Option<String> {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_image_file(file_name: &str) -> bool {
    extension(file_name)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn fold_umlauts(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.to_lowercase().chars() {
        match ch {
            'ä' => folded.push_str("ae"),
            'ö' => folded.push_str("oe"),
            'ü' => folded.push_str("ue"),
            'ß' => folded.push_str("ss"),
            other => folded.push(other),
        }
    }
    folded
}

/// Semantic image subtype inferred from the file name.
pub fn classify_image(file_name: &str) -> &'static str {
    let folded = fold_umlauts(file_name);
    IMAGE_KEYWORDS
        .iter()
        .find(|(keyword, _)| folded.contains(keyword))
        .map(|(_, image_type)| *image_type)
        .unwrap_or(IMAGE_TYPE_OTHER)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    extension(file_name)
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, content_type)| *content_type)
        })
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Title shown in the UI: the file stem, or the whole name when it has none.
pub fn title_from_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    match trimmed.rsplit_once('.') {
        Some((stem, _)) if !stem.trim().is_empty() => stem.trim().to_string(),
        _ => trimmed.to_string(),
    }
}
