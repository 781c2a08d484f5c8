//! The structured metadata payload stored inside every version.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat key -> value mapping for one metadata category.
pub type Fields = Map<String, Value>;

/// Categorized metadata snapshot.
///
/// The version log treats this as an opaque blob; only the metadata service
/// interprets its shape (normalization, stripping, validation).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MetadataBundle {
    /// Simple descriptive fields (title, format, dimensions, ...).
    #[serde(default)]
    pub basic: Fields,

    /// Camera / capture fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<Fields>,

    /// Editorial fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iptc: Option<Fields>,

    /// Rights / tooling fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmp: Option<Fields>,

    /// User-defined fields and anything the normalizer did not recognize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Fields>,
}

impl MetadataBundle {
    /// Iterate over every present category as `(name, fields)`.
    pub fn categories(&self) -> impl Iterator<Item = (&'static str, &Fields)> {
        [
            ("basic", Some(&self.basic)),
            ("exif", self.exif.as_ref()),
            ("iptc", self.iptc.as_ref()),
            ("xmp", self.xmp.as_ref()),
            ("custom", self.custom.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, fields)| fields.map(|f| (name, f)))
    }

    /// True when exif, iptc, xmp and custom carry no fields.
    pub fn is_stripped(&self) -> bool {
        [&self.exif, &self.iptc, &self.xmp, &self.custom]
            .into_iter()
            .all(|c| c.as_ref().is_none_or(|f| f.is_empty()))
    }
}
