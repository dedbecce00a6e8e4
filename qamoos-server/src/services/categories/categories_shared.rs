use qamoos_blob::{MediaUploads, UploadTarget};
use qamoos_core::{DictResult, FieldErrors, Translations};
use serde_json::{Map, Value};

use crate::services::form;

/// Category fields as submitted. Media refs are never taken from the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDraft {
    pub word: Option<String>,
    pub translation: Option<Translations>,
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn from_fields(fields: &Map<String, Value>) -> DictResult<Self> {
        Ok(Self {
            word: form::text(fields, "word"),
            translation: form::structured(fields, "translation")?,
            description: form::text(fields, "description"),
        })
    }
}

/// Categories own one image and one audio; dialect targets make no sense here.
pub fn check_targets(uploads: &MediaUploads) -> DictResult<()> {
    let mut errors = FieldErrors::new();
    for target in uploads.targets() {
        if let UploadTarget::Dialect { .. } = target {
            errors.push(target.to_string(), "categories have no dialect entries");
        }
    }
    errors.into_result("Invalid upload descriptors")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_reads_encoded_translation() {
        let fields = match json!({
            "word": " Greetings ",
            "translation": "{\"english\":\"greetings\",\"roman\":\"salaam\"}"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let draft = CategoryDraft::from_fields(&fields).unwrap();
        assert_eq!(draft.word.as_deref(), Some("Greetings"));
        let translation = draft.translation.unwrap();
        assert_eq!(translation.roman.as_deref(), Some("salaam"));
        assert!(translation.urdu.is_none());
    }
}
