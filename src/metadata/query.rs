//! Query helpers layered on [`ExifTool::execute`].
//!
//! None of these touch the protocol. They build argument lists, run one
//! batch and reshape the parsed records.

use serde_json::Value;

use super::{parse_records, Metadata};
use crate::batch::{ArgList, GROUP_NAMES, JSON, NUMERIC};
use crate::tool::ExifTool;
use crate::{Error, Result};

impl ExifTool {
    /// Return all metadata for the given files.
    ///
    /// Runs `-G -j -n` over the files, so keys carry their group prefix
    /// (`group:tag`) and values are numeric where exiftool can manage it.
    /// Records come back in the order exiftool printed them. An empty list
    /// of files yields an empty list of records.
    pub async fn get_metadata_batch(&self, filenames: impl ArgList) -> Result<Vec<Metadata>> {
        let filenames = filenames.into_args("filenames")?;
        self.query(filenames).await
    }

    /// Return all metadata for a single file.
    pub async fn get_metadata(&self, filename: &str) -> Result<Metadata> {
        single(self.query(vec![filename.to_string()]).await?)
    }

    /// Return only the given tags for the given files.
    ///
    /// Tag names may include a group, as in `EXIF:Make`. A tag a file lacks
    /// is simply missing from its record.
    pub async fn get_tags_batch(
        &self,
        tags: impl ArgList,
        filenames: impl ArgList,
    ) -> Result<Vec<Metadata>> {
        let tags = tags.into_args("tags")?;
        let filenames = filenames.into_args("filenames")?;
        self.query(tag_params(&tags, filenames)).await
    }

    /// Return only the given tags for a single file.
    pub async fn get_tags(&self, tags: impl ArgList, filename: &str) -> Result<Metadata> {
        let tags = tags.into_args("tags")?;
        single(self.query(tag_params(&tags, vec![filename.to_string()])).await?)
    }

    /// Extract one tag from each file.
    ///
    /// Returns one entry per record, `None` where the tag is absent.
    pub async fn get_tag_batch(
        &self,
        tag: &str,
        filenames: impl ArgList,
    ) -> Result<Vec<Option<Value>>> {
        let records = self.get_tags_batch([tag], filenames).await?;
        Ok(records.into_iter().map(Metadata::into_first_tag).collect())
    }

    /// Extract one tag from a single file, `None` if it is absent.
    pub async fn get_tag(&self, tag: &str, filename: &str) -> Result<Option<Value>> {
        Ok(self.get_tags([tag], filename).await?.into_first_tag())
    }

    async fn query(&self, params: Vec<String>) -> Result<Vec<Metadata>> {
        let mut args: Vec<String> = [GROUP_NAMES, JSON, NUMERIC]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(params);

        let output = self.execute(&args).await?;
        parse_records(&output)
    }
}

fn tag_params(tags: &[String], filenames: Vec<String>) -> Vec<String> {
    let mut params: Vec<String> = tags.iter().map(|t| format!("-{t}")).collect();
    params.extend(filenames);
    params
}

fn single(records: Vec<Metadata>) -> Result<Metadata> {
    records.into_iter().next().ok_or(Error::EmptyResponse)
}
