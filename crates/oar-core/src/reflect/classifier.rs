use std::fmt;

use log::trace;

use crate::document::ParameterLocation;
use crate::error::{ReflectError, Result};

use super::walker::FieldDescriptor;

/// Where a field travels in an HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
    Cookie,
    FormField,
    FormFile,
    Body,
    /// Excluded with `json:"-"`.
    Ignored,
}

/// Tags that place a field outside the body. A field carries at most one.
const LOCATION_TAGS: [(&str, Location); 5] = [
    ("path", Location::Path),
    ("query", Location::Query),
    ("header", Location::Header),
    ("cookie", Location::Cookie),
    ("formData", Location::FormField),
];

impl Location {
    /// Tag key that names a parameter in this location.
    pub fn tag_key(&self) -> Option<&'static str> {
        match self {
            Location::Path => Some("path"),
            Location::Query => Some("query"),
            Location::Header => Some("header"),
            Location::Cookie => Some("cookie"),
            Location::FormField | Location::FormFile => Some("formData"),
            Location::Body | Location::Ignored => None,
        }
    }

    pub fn parameter_location(&self) -> Option<ParameterLocation> {
        match self {
            Location::Path => Some(ParameterLocation::Path),
            Location::Query => Some(ParameterLocation::Query),
            Location::Header => Some(ParameterLocation::Header),
            Location::Cookie => Some(ParameterLocation::Cookie),
            Location::FormField | Location::FormFile => Some(ParameterLocation::FormData),
            Location::Body | Location::Ignored => None,
        }
    }

    /// Parameter group order: path, query, header, cookie, form.
    pub fn parameter_rank(&self) -> Option<u8> {
        match self {
            Location::Path => Some(0),
            Location::Query => Some(1),
            Location::Header => Some(2),
            Location::Cookie => Some(3),
            Location::FormField | Location::FormFile => Some(4),
            Location::Body | Location::Ignored => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
            Location::Cookie => "cookie",
            Location::FormField => "form field",
            Location::FormFile => "form file",
            Location::Body => "body",
            Location::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// Decide where a field travels from its tags and type.
pub fn classify(field: &FieldDescriptor) -> Result<Location> {
    let present: Vec<_> = LOCATION_TAGS
        .iter()
        .filter(|(tag, _)| field.tags.contains(tag))
        .collect();

    let is_file = field.value_type.kind().is_file();
    let location = match present.as_slice() {
        [] if field.tags.get("json") == Some("-") => Location::Ignored,
        [] if is_file => Location::FormFile,
        [] => Location::Body,
        [(_, Location::FormField)] if is_file => Location::FormFile,
        [(_, location)] => *location,
        many => {
            return Err(ReflectError::AmbiguousLocation {
                field: field.name.clone(),
                tags: many
                    .iter()
                    .map(|(tag, _)| *tag)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    };

    trace!("field {} is a {location}", field.name);
    Ok(location)
}

/// Required-ness of a classified field. Path parameters are always
/// required; otherwise an explicit `required` tag beats optionality.
pub fn is_required(field: &FieldDescriptor, location: Location) -> Result<bool> {
    if location == Location::Path {
        return Ok(true);
    }
    Ok(field
        .tags
        .flag("required", &field.name)?
        .unwrap_or(!field.optional))
}

/// Name a field is published under in `location`.
pub fn parameter_name(field: &FieldDescriptor, location: Location) -> &str {
    match location.tag_key().and_then(|key| field.tags.name(key)) {
        Some(name) if !name.is_empty() => name,
        _ => &field.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileUpload, Tags, TypeHandle};

    fn field<T: crate::types::Reflect>(name: &str, tag: &str, optional: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            value_type: TypeHandle::of::<T>(),
            optional,
            tags: Tags::parse("F", tag).unwrap(),
            embedded: false,
            embedding_chain: Vec::new(),
        }
    }

    #[test]
    fn test_location_tags() {
        let cases = [
            (r#"path:"id""#, Location::Path),
            (r#"query:"q""#, Location::Query),
            (r#"header:"X-Trace""#, Location::Header),
            (r#"cookie:"session""#, Location::Cookie),
            (r#"formData:"note""#, Location::FormField),
            (r#"json:"name""#, Location::Body),
            ("", Location::Body),
            (r#"json:"-""#, Location::Ignored),
        ];
        for (tag, expected) in cases {
            assert_eq!(classify(&field::<String>("F", tag, false)).unwrap(), expected, "{tag}");
        }
    }

    #[test]
    fn test_files_go_to_form() {
        assert_eq!(
            classify(&field::<FileUpload>("Upload", "", false)).unwrap(),
            Location::FormFile
        );
        assert_eq!(
            classify(&field::<FileUpload>("Upload", r#"formData:"upload""#, false)).unwrap(),
            Location::FormFile
        );
    }

    #[test]
    fn test_conflicting_tags() {
        let err = classify(&field::<String>("Id", r#"path:"id" query:"id""#, false)).unwrap_err();
        match err {
            ReflectError::AmbiguousLocation { field, tags } => {
                assert_eq!(field, "Id");
                assert_eq!(tags, "path, query");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_required() {
        let f = field::<String>("Id", r#"path:"id""#, true);
        assert!(is_required(&f, Location::Path).unwrap());

        let f = field::<String>("Q", r#"query:"q""#, true);
        assert!(!is_required(&f, Location::Query).unwrap());

        let f = field::<String>("Q", r#"query:"q" required:"true""#, true);
        assert!(is_required(&f, Location::Query).unwrap());

        let f = field::<String>("Name", r#"required:"false""#, false);
        assert!(!is_required(&f, Location::Body).unwrap());

        let f = field::<String>("Name", "", false);
        assert!(is_required(&f, Location::Body).unwrap());
    }

    #[test]
    fn test_parameter_name() {
        let f = field::<String>("Id", r#"path:"id,string""#, false);
        assert_eq!(parameter_name(&f, Location::Path), "id");
        let f = field::<FileUpload>("Upload", "", false);
        assert_eq!(parameter_name(&f, Location::FormFile), "Upload");
    }
}
