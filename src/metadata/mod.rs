//! Metadata records parsed from exiftool's JSON output.
//!
//! Queries run with `-G -j -n`, so exiftool answers with a JSON array holding
//! one object per file. Keys are `group:tag` strings, values are whatever
//! JSON scalar exiftool chose, and [`SOURCE_FILE`] names the file the record
//! belongs to.
//!
//! # Example
//!
//! ```ignore
//! let records = et.get_metadata_batch(["a.jpg", "b.png"]).await?;
//! for record in &records {
//!     println!("{:?} {:?}", record.source_file(), record.get("EXIF:DateTimeOriginal"));
//! }
//! ```

mod query;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Key exiftool uses for the originating file of a record.
pub const SOURCE_FILE: &str = "SourceFile";

/// All tags exiftool reported for one file.
///
/// Key order is the order exiftool printed them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// The file this record describes.
    pub fn source_file(&self) -> Option<&str> {
        self.0.get(SOURCE_FILE).and_then(Value::as_str)
    }

    /// Look up a tag by its exact key, e.g. `"EXIF:Make"`.
    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.0.get(tag)
    }

    /// Whether the tag is present.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    /// Iterate over tags, skipping [`SOURCE_FILE`].
    pub fn tags(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != SOURCE_FILE)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tags, not counting [`SOURCE_FILE`].
    pub fn tag_count(&self) -> usize {
        self.tags().count()
    }

    /// Drop [`SOURCE_FILE`] and return the first remaining value.
    pub fn into_first_tag(self) -> Option<Value> {
        self.0
            .into_iter()
            .find(|(k, _)| k != SOURCE_FILE)
            .map(|(_, v)| v)
    }

    /// Unwrap into the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Metadata(map)
    }
}

/// Split a `group:tag` key into its group and tag name.
///
/// ```ignore
/// assert_eq!(split_group("EXIF:Make"), (Some("EXIF"), "Make"));
/// assert_eq!(split_group("SourceFile"), (None, "SourceFile"));
/// ```
pub fn split_group(key: &str) -> (Option<&str>, &str) {
    match key.split_once(':') {
        Some((group, tag)) => (Some(group), tag),
        None => (None, key),
    }
}

/// Parse the output of a `-j` batch.
///
/// exiftool prints nothing at all when a batch names no files, which is an
/// empty result rather than a parse error.
pub fn parse_records(output: &str) -> Result<Vec<Metadata>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(output).map_err(|e| Error::json_parse(e, output))
}
