//! File attachments and multipart form assembly.

use crate::encode::field_value;
use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

/// One file to upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    bytes: Bytes,
    file_name: Option<String>,
    mime: Option<String>,
}

impl FilePart {
    /// Create a part from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Set the file name reported to the server.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the MIME type of this part.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn into_part(self) -> Result<Part> {
        let mut part = Part::bytes(self.bytes.to_vec());
        if let Some(name) = self.file_name {
            part = part.file_name(name);
        }
        if let Some(mime) = self.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| Error::config(format!("invalid MIME type `{mime}`: {e}")))?;
        }
        Ok(part)
    }
}

/// A single file or an ordered sequence of files within one category.
#[derive(Debug, Clone)]
pub enum FileGroup {
    One(FilePart),
    Many(Vec<FilePart>),
}

/// The files carried by one request.
#[derive(Debug, Clone)]
pub enum Attachments {
    /// One file, uploaded under the fixed field name `file`.
    Single(FilePart),
    /// An ordered sequence, each uploaded under the repeated name `files[]`.
    List(Vec<FilePart>),
    /// Named categories, uploaded under `<category>` (one file) or
    /// `<category>[]` (sequence), iterated in insertion order.
    Named(Vec<(String, FileGroup)>),
}

impl Attachments {
    /// Flatten to `(field name, part)` pairs in upload order.
    pub(crate) fn form_fields(&self) -> Vec<(String, FilePart)> {
        match self {
            Attachments::Single(file) => vec![("file".to_string(), file.clone())],
            Attachments::List(files) => files
                .iter()
                .map(|file| ("files[]".to_string(), file.clone()))
                .collect(),
            Attachments::Named(categories) => {
                let mut fields = Vec::new();
                for (category, group) in categories {
                    match group {
                        FileGroup::One(file) => fields.push((category.clone(), file.clone())),
                        FileGroup::Many(files) => {
                            for file in files {
                                fields.push((format!("{category}[]"), file.clone()));
                            }
                        }
                    }
                }
                fields
            }
        }
    }
}

/// Assemble the multipart form: auxiliary `data` fields first, then the
/// flattened file parts.
pub(crate) fn build_form(files: &Attachments, data: &Map<String, Value>) -> Result<Form> {
    let mut form = Form::new();
    for (key, value) in data {
        form = form.text(key.clone(), field_value(value));
    }
    for (field, part) in files.form_fields() {
        form = form.part(field, part.into_part()?);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(tag: &str) -> FilePart {
        FilePart::new(tag.as_bytes().to_vec()).file_name(format!("{tag}.bin"))
    }

    fn field_names(attachments: &Attachments) -> Vec<String> {
        attachments
            .form_fields()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    #[test]
    fn test_single_file_uses_fixed_field_name() {
        let attachments = Attachments::Single(part("a"));
        assert_eq!(field_names(&attachments), vec!["file"]);
    }

    #[test]
    fn test_list_repeats_field_name_in_order() {
        let attachments = Attachments::List(vec![part("a"), part("b"), part("c")]);
        assert_eq!(field_names(&attachments), vec!["files[]", "files[]", "files[]"]);

        let names: Vec<_> = attachments
            .form_fields()
            .into_iter()
            .map(|(_, p)| p.file_name.unwrap())
            .collect();
        assert_eq!(names, vec!["a.bin", "b.bin", "c.bin"]);
    }

    #[test]
    fn test_named_categories_preserve_insertion_order() {
        let attachments = Attachments::Named(vec![
            (
                "photos".to_string(),
                FileGroup::Many(vec![part("f1"), part("f2")]),
            ),
            ("doc".to_string(), FileGroup::One(part("f3"))),
        ]);

        let fields = attachments.form_fields();
        let pairs: Vec<_> = fields
            .iter()
            .map(|(name, p)| (name.as_str(), p.file_name.as_deref().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("photos[]", "f1.bin"),
                ("photos[]", "f2.bin"),
                ("doc", "f3.bin"),
            ]
        );
    }

    #[test]
    fn test_invalid_mime_is_a_config_error() {
        let file = FilePart::new(b"x".to_vec()).mime("not a mime");
        let err = file.into_part().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_build_form_accepts_data_and_files() {
        let mut data = Map::new();
        data.insert("caption".to_string(), serde_json::json!("holiday"));
        let attachments = Attachments::Single(part("a"));
        assert!(build_form(&attachments, &data).is_ok());
    }
}
