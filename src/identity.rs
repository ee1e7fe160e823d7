use std::fmt;

const MAX_EXTENSION_CHARS: usize = 5;

/// Content address of a candidate URL: `md5(url)` in hex plus a short
/// extension taken from the URL path. Identical URLs always map to the same
/// identity; any byte difference (query string included) gives a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    digest: String,
    extension: String,
}

impl FileIdentity {
    pub fn from_url(url: &str) -> Self {
        Self {
            digest: format!("{:x}", md5::compute(url.as_bytes())),
            extension: extension_of(url),
        }
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.digest, self.extension)
    }
}

/// Extension of the last path segment, query string ignored, case kept,
/// capped at five characters. A segment without a dot is returned whole
/// (still capped), so the result never contains a path separator.
pub fn extension_of(url: &str) -> String {
    let path = url.split('?').next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let ext = segment.rsplit('.').next().unwrap_or_default();
    ext.chars().take(MAX_EXTENSION_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_md5_hex() {
        let identity = FileIdentity::from_url("https://x.com/a.png");
        assert_eq!(identity.digest().len(), 32);
        assert!(identity.digest().chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(
            FileIdentity::from_url("").digest(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn extension_edge_cases() {
        assert_eq!(extension_of("https://x.com/img.JPEG?size=full"), "JPEG");
        assert_eq!(extension_of("https://x.com/photo"), "photo");
        assert_eq!(extension_of("https://x.com/photograph"), "photo");
        assert_eq!(extension_of("https://x.com/a.tar.gz"), "gz");
        assert_eq!(extension_of("https://x.com/image.webpxyz"), "webpx");
        assert_eq!(extension_of("https://x.com/dir/"), "");
    }
}
