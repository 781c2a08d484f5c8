//! Maps provider-specific extraction output into the bundle taxonomy.
//!
//! The table is fixed. Keys with an explicit `exif:`, `iptc:` or `xmp:`
//! prefix go to that category; unknown keys land in `custom` untouched.

use crate::models::bundle::{Fields, MetadataBundle};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    Basic,
    Exif,
    Iptc,
    Xmp,
}

/// (provider key, category, normalized key). Matching is case-insensitive.
const FIELD_TABLE: &[(&str, Category, &str)] = &[
    // basic
    ("ImageWidth", Category::Basic, "width"),
    ("ExifImageWidth", Category::Basic, "width"),
    ("PixelXDimension", Category::Basic, "width"),
    ("width", Category::Basic, "width"),
    ("ImageHeight", Category::Basic, "height"),
    ("ExifImageHeight", Category::Basic, "height"),
    ("PixelYDimension", Category::Basic, "height"),
    ("height", Category::Basic, "height"),
    ("format", Category::Basic, "format"),
    ("FileType", Category::Basic, "format"),
    ("size", Category::Basic, "size"),
    ("FileSize", Category::Basic, "size"),
    ("ColorSpace", Category::Basic, "colorSpace"),
    ("space", Category::Basic, "colorSpace"),
    ("Orientation", Category::Basic, "orientation"),
    ("orientation", Category::Basic, "orientation"),
    ("title", Category::Basic, "title"),
    ("ImageDescription", Category::Basic, "description"),
    ("density", Category::Basic, "density"),
    ("hasAlpha", Category::Basic, "hasAlpha"),
    // exif
    ("Make", Category::Exif, "make"),
    ("Model", Category::Exif, "model"),
    ("LensModel", Category::Exif, "lensModel"),
    ("LensMake", Category::Exif, "lensMake"),
    ("Software", Category::Exif, "software"),
    ("DateTimeOriginal", Category::Exif, "dateTimeOriginal"),
    ("CreateDate", Category::Exif, "createDate"),
    ("ModifyDate", Category::Exif, "modifyDate"),
    ("ExposureTime", Category::Exif, "exposureTime"),
    ("FNumber", Category::Exif, "fNumber"),
    ("ISO", Category::Exif, "iso"),
    ("ISOSpeedRatings", Category::Exif, "iso"),
    ("FocalLength", Category::Exif, "focalLength"),
    ("FocalLengthIn35mmFormat", Category::Exif, "focalLength35mm"),
    ("Flash", Category::Exif, "flash"),
    ("WhiteBalance", Category::Exif, "whiteBalance"),
    ("ExposureProgram", Category::Exif, "exposureProgram"),
    ("MeteringMode", Category::Exif, "meteringMode"),
    ("GPSLatitude", Category::Exif, "gpsLatitude"),
    ("GPSLongitude", Category::Exif, "gpsLongitude"),
    ("GPSAltitude", Category::Exif, "gpsAltitude"),
    ("latitude", Category::Exif, "gpsLatitude"),
    ("longitude", Category::Exif, "gpsLongitude"),
    // iptc
    ("ObjectName", Category::Iptc, "objectName"),
    ("Headline", Category::Iptc, "headline"),
    ("Caption-Abstract", Category::Iptc, "caption"),
    ("Caption", Category::Iptc, "caption"),
    ("Keywords", Category::Iptc, "keywords"),
    ("By-line", Category::Iptc, "byline"),
    ("Byline", Category::Iptc, "byline"),
    ("By-lineTitle", Category::Iptc, "bylineTitle"),
    ("Credit", Category::Iptc, "credit"),
    ("Source", Category::Iptc, "source"),
    ("CopyrightNotice", Category::Iptc, "copyrightNotice"),
    ("City", Category::Iptc, "city"),
    ("Sub-location", Category::Iptc, "sublocation"),
    ("Province-State", Category::Iptc, "provinceState"),
    ("Country-PrimaryLocationName", Category::Iptc, "country"),
    ("Country", Category::Iptc, "country"),
    ("Category", Category::Iptc, "category"),
    ("SpecialInstructions", Category::Iptc, "specialInstructions"),
    // xmp
    ("Rating", Category::Xmp, "rating"),
    ("Label", Category::Xmp, "label"),
    ("Creator", Category::Xmp, "creator"),
    ("CreatorTool", Category::Xmp, "creatorTool"),
    ("Rights", Category::Xmp, "rights"),
    ("UsageTerms", Category::Xmp, "usageTerms"),
    ("WebStatement", Category::Xmp, "webStatement"),
    ("Marked", Category::Xmp, "marked"),
    ("MetadataDate", Category::Xmp, "metadataDate"),
    ("DocumentID", Category::Xmp, "documentId"),
    ("InstanceID", Category::Xmp, "instanceId"),
];

fn lookup(key: &str) -> Option<(Category, String)> {
    for (prefix, category) in [
        ("exif:", Category::Exif),
        ("iptc:", Category::Iptc),
        ("xmp:", Category::Xmp),
    ] {
        let head = key.get(..prefix.len());
        let rest = key.get(prefix.len()..).unwrap_or_default();
        if head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) && !rest.is_empty() {
            return Some((category, rest.to_string()));
        }
    }

    FIELD_TABLE
        .iter()
        .find(|(provider, _, _)| provider.eq_ignore_ascii_case(key))
        .map(|(_, category, normalized)| (*category, (*normalized).to_string()))
}

/// Normalize raw extraction output. Total: every input key lands somewhere.
///
/// Null values carry no information and are dropped. Categories that end up
/// with no fields are left absent.
pub fn normalize_metadata<'a, I>(raw: I) -> MetadataBundle
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut basic = Fields::new();
    let mut exif = Fields::new();
    let mut iptc = Fields::new();
    let mut xmp = Fields::new();
    let mut custom = Fields::new();

    for (key, value) in raw {
        if value.is_null() {
            continue;
        }
        match lookup(key) {
            Some((Category::Basic, name)) => basic.entry(name).or_insert_with(|| value.clone()),
            Some((Category::Exif, name)) => exif.entry(name).or_insert_with(|| value.clone()),
            Some((Category::Iptc, name)) => iptc.entry(name).or_insert_with(|| value.clone()),
            Some((Category::Xmp, name)) => xmp.entry(name).or_insert_with(|| value.clone()),
            None => custom.entry(key.clone()).or_insert_with(|| value.clone()),
        };
    }

    let present = |fields: Fields| (!fields.is_empty()).then_some(fields);
    MetadataBundle {
        basic,
        exif: present(exif),
        iptc: present(iptc),
        xmp: present(xmp),
        custom: present(custom),
    }
}
