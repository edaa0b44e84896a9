/// Extracts the bucket name from a configured value that may be a full
/// virtual-hosted domain (`mybucket.s3.eu-central-1.s4.mega.io`) or any
/// dotted host (`mybucket.example`). Plain names pass through unchanged.
pub fn normalize_bucket_name(raw: &str) -> String {
    if let Some((name, _)) = raw.split_once(".s3") {
        return name.to_string();
    }

    match raw.split_once('.') {
        Some((name, _)) => name.to_string(),
        None => raw.to_string(),
    }
}
