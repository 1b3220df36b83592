// Content-type inference from a key's file extension

// Only these extensions are recognised; anything else yields `None`.
const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("txt", "text/plain"),
    ("pdf", "application/pdf"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("doc", "application/msword"),
    ("dot", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("dotx", "application/vnd.openxmlformats-officedocument.wordprocessingml.template"),
    ("docm", "application/vnd.ms-word.document.macroEnabled.12"),
    ("dotm", "application/vnd.ms-word.template.macroEnabled.12"),
    ("xls", "application/vnd.ms-excel"),
    ("xlt", "application/vnd.ms-excel"),
    ("xla", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xltx", "application/vnd.openxmlformats-officedocument.spreadsheetml.template"),
    ("xlsm", "application/vnd.ms-excel.sheet.macroEnabled.12"),
    ("xltm", "application/vnd.ms-excel.template.macroEnabled.12"),
    ("xlam", "application/vnd.ms-excel.addin.macroEnabled.12"),
    ("xlsb", "application/vnd.ms-excel.sheet.binary.macroEnabled.12"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("pot", "application/vnd.ms-powerpoint"),
    ("pps", "application/vnd.ms-powerpoint"),
    ("ppa", "application/vnd.ms-powerpoint"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    ("potx", "application/vnd.openxmlformats-officedocument.presentationml.template"),
    ("ppsx", "application/vnd.openxmlformats-officedocument.presentationml.slideshow"),
    ("ppam", "application/vnd.ms-powerpoint.addin.macroEnabled.12"),
    ("pptm", "application/vnd.ms-powerpoint.presentation.macroEnabled.12"),
    ("potm", "application/vnd.ms-powerpoint.template.macroEnabled.12"),
    ("ppsm", "application/vnd.ms-powerpoint.slideshow.macroEnabled.12"),
    ("mdb", "application/vnd.ms-access"),
];

/// Extension after the last dot, if it is made of word characters only.
fn extension(path: &str) -> Option<&str> {
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(ext)
}

/// Look up the content type for `path`, case-insensitively.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let ext = extension(path)?.to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
