//! BLAKE3 content hashing for exported files and project fingerprints.

use std::path::Path;

const PREFIX: &str = "blake3:";

fn prefixed(hash: blake3::Hash) -> String {
    format!("{PREFIX}{}", hash.to_hex())
}

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hash a byte slice. Returns `"blake3:{hex}"`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    prefixed(blake3::hash(bytes))
}

/// Hash a file on disk, streaming its contents.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    hasher
        .update_reader(file)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(prefixed(hasher.finalize()))
}

/// Hash an ordered list of `(relative path, content hash)` pairs.
pub fn tree_hash<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = blake3::Hasher::new();
    for (rel, hash) in entries {
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    prefixed(hasher.finalize())
}
