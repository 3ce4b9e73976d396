//! # Content Pack Keys
//!
//! Builds and parses the storage keys of content-pack archives.

use std::fmt;

/// Root prefix under which every pack archive is stored
pub const PACKS_ROOT: &str = "content/packs";

/// File extension of a packaged content pack
pub const PACK_ARCHIVE_EXTENSION: &str = "zip";

/// Object metadata entry holding the archive's hex SHA-256 digest
pub const CHECKSUM_METADATA_KEY: &str = "sha256";

/// Storage key of one version of a content pack
///
/// Format: `content/packs/{pack_id}/{pack_version}/{pack_id}.zip`
pub fn pack_archive_key(pack_id: &str, pack_version: &str) -> String {
    format!("{PACKS_ROOT}/{pack_id}/{pack_version}/{pack_id}.{PACK_ARCHIVE_EXTENSION}")
}

/// Listing prefix covering every stored version of a content pack
///
/// The trailing slash keeps `Foo` from matching `FooBar`.
pub fn pack_prefix(pack_id: &str) -> String {
    format!("{PACKS_ROOT}/{pack_id}/")
}

/// A parsed pack archive key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackKey {
    pub pack_id: String,
    pub pack_version: String,
}

impl fmt::Display for PackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pack_archive_key(&self.pack_id, &self.pack_version))
    }
}

/// Parse a storage key back into pack id and version
///
/// Returns `None` for keys outside the pack layout, including archives whose
/// file name does not match the pack id.
pub fn parse_pack_key(key: &str) -> Option<PackKey> {
    let rest = key.strip_prefix(PACKS_ROOT)?.strip_prefix('/')?;
    let mut parts = rest.split('/');
    let pack_id = parts.next()?;
    let pack_version = parts.next()?;
    let file_name = parts.next()?;
    if parts.next().is_some() || pack_id.is_empty() || pack_version.is_empty() {
        return None;
    }

    let expected = format!("{pack_id}.{PACK_ARCHIVE_EXTENSION}");
    if file_name != expected {
        return None;
    }

    Some(PackKey {
        pack_id: pack_id.to_string(),
        pack_version: pack_version.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_archive_key() {
        assert_eq!(
            pack_archive_key("MyPack", "1.2.3"),
            "content/packs/MyPack/1.2.3/MyPack.zip"
        );
    }

    #[test]
    fn test_pack_prefix_has_trailing_slash() {
        assert_eq!(pack_prefix("MyPack"), "content/packs/MyPack/");
    }

    #[test]
    fn test_parse_pack_key() {
        let parsed = parse_pack_key("content/packs/MyPack/1.2.3/MyPack.zip").unwrap();
        assert_eq!(parsed.pack_id, "MyPack");
        assert_eq!(parsed.pack_version, "1.2.3");
        assert_eq!(parsed.to_string(), "content/packs/MyPack/1.2.3/MyPack.zip");
    }

    #[test]
    fn test_parse_pack_key_rejects_foreign_keys() {
        assert!(parse_pack_key("content/packs/MyPack/1.2.3/Other.zip").is_none());
        assert!(parse_pack_key("content/packs/MyPack/1.2.3").is_none());
        assert!(parse_pack_key("content/packs/MyPack/1.2.3/MyPack.zip/extra").is_none());
        assert!(parse_pack_key("other/MyPack/1.2.3/MyPack.zip").is_none());
        assert!(parse_pack_key("content/packs//1.2.3/.zip").is_none());
    }
}
