//! Argument lists for the query helpers.

use crate::{Error, Result};

/// A list of strings passed as tag names or filenames.
///
/// Implemented for vectors, slices and arrays of anything string-like. It is
/// also implemented for `&str` and `String`, but those always fail with
/// [`Error::SingleStringArgument`]: a lone filename where a list was expected
/// is a caller mistake, and is reported instead of being guessed at.
///
/// ```ignore
/// et.get_tags_batch(["EXIF:Make", "EXIF:Model"], &files).await?;
/// et.get_metadata_batch("a.jpg").await; // Err(SingleStringArgument)
/// ```
pub trait ArgList {
    /// Convert into owned arguments. `param` names the parameter in errors.
    fn into_args(self, param: &'static str) -> Result<Vec<String>>;
}

impl ArgList for &str {
    fn into_args(self, param: &'static str) -> Result<Vec<String>> {
        Err(Error::SingleStringArgument { param })
    }
}

impl ArgList for String {
    fn into_args(self, param: &'static str) -> Result<Vec<String>> {
        Err(Error::SingleStringArgument { param })
    }
}

impl ArgList for &String {
    fn into_args(self, param: &'static str) -> Result<Vec<String>> {
        Err(Error::SingleStringArgument { param })
    }
}

impl<T: AsRef<str>> ArgList for Vec<T> {
    fn into_args(self, _param: &'static str) -> Result<Vec<String>> {
        Ok(collect(&self))
    }
}

impl<T: AsRef<str>> ArgList for &Vec<T> {
    fn into_args(self, _param: &'static str) -> Result<Vec<String>> {
        Ok(collect(self))
    }
}

impl<T: AsRef<str>> ArgList for &[T] {
    fn into_args(self, _param: &'static str) -> Result<Vec<String>> {
        Ok(collect(self))
    }
}

impl<T: AsRef<str>, const N: usize> ArgList for [T; N] {
    fn into_args(self, _param: &'static str) -> Result<Vec<String>> {
        Ok(collect(&self))
    }
}

impl<T: AsRef<str>, const N: usize> ArgList for &[T; N] {
    fn into_args(self, _param: &'static str) -> Result<Vec<String>> {
        Ok(collect(self))
    }
}

fn collect<T: AsRef<str>>(items: &[T]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}
