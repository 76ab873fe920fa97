/*!
 * Elements of a package: kinds, handles and content.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::package::Package;

/// Mimetype of an element that carries no content
pub const EMPTY_MIMETYPE: &str = "x-advene/none";

/// Closed set of element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Media,
    Annotation,
    Relation,
    List,
    Tag,
    View,
    Query,
    Resource,
    Import,
}

impl ElementKind {
    /// Every kind, in the order groups enumerate them
    pub const ALL: [ElementKind; 9] = [
        ElementKind::Media,
        ElementKind::Annotation,
        ElementKind::Relation,
        ElementKind::List,
        ElementKind::Tag,
        ElementKind::View,
        ElementKind::Query,
        ElementKind::Resource,
        ElementKind::Import,
    ];

    /// Storage name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Media => "media",
            ElementKind::Annotation => "annotation",
            ElementKind::Relation => "relation",
            ElementKind::List => "list",
            ElementKind::Tag => "tag",
            ElementKind::View => "view",
            ElementKind::Query => "query",
            ElementKind::Resource => "resource",
            ElementKind::Import => "import",
        }
    }

    /// Name of the group view listing elements of this kind
    pub fn plural(&self) -> &'static str {
        match self {
            ElementKind::Media => "medias",
            ElementKind::Annotation => "annotations",
            ElementKind::Relation => "relations",
            ElementKind::List => "lists",
            ElementKind::Tag => "tags",
            ElementKind::View => "views",
            ElementKind::Query => "queries",
            ElementKind::Resource => "resources",
            ElementKind::Import => "imports",
        }
    }

    /// Whether elements of this kind carry a content triple
    pub fn has_content(&self) -> bool {
        matches!(
            self,
            ElementKind::Annotation
                | ElementKind::Relation
                | ElementKind::View
                | ElementKind::Query
                | ElementKind::Resource
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "media" => Ok(ElementKind::Media),
            "annotation" => Ok(ElementKind::Annotation),
            "relation" => Ok(ElementKind::Relation),
            "list" => Ok(ElementKind::List),
            "tag" => Ok(ElementKind::Tag),
            "view" => Ok(ElementKind::View),
            "query" => Ok(ElementKind::Query),
            "resource" => Ok(ElementKind::Resource),
            "import" => Ok(ElementKind::Import),
            _ => Err(anyhow::anyhow!("Invalid element kind: {}", s)),
        }
    }
}

/// Content triple of an element. Opaque to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Mimetype of the data
    pub mimetype: String,
    /// Id-ref of the schema resource describing the data
    #[serde(default)]
    pub schema: Option<String>,
    /// Location of the data when stored outside the package
    #[serde(default)]
    pub url: Option<String>,
}

impl Content {
    pub fn new(mimetype: impl Into<String>) -> Self {
        Self {
            mimetype: mimetype.into(),
            schema: None,
            url: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// True when the content is the empty placeholder
    pub fn is_empty(&self) -> bool {
        self.mimetype == EMPTY_MIMETYPE && self.schema.is_none() && self.url.is_none()
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::new(EMPTY_MIMETYPE)
    }
}

/// Handle to an element: owning package, id and kind.
///
/// Handles are cheap to clone and compare equal when they designate the same
/// element of the same package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    package: String,
    id: String,
    kind: ElementKind,
}

impl Element {
    pub fn new(package: impl Into<String>, id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            package: package.into(),
            id: id.into(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Id of the package owning the element
    pub fn package_id(&self) -> &str {
        &self.package
    }

    /// Id-ref of this element as seen from `owner`, if `owner` can reach it
    pub fn make_idref_in(&self, owner: &Package) -> Option<String> {
        owner.make_idref_in(self)
    }

    /// Package-independent form `package-id#element-id`
    pub fn absolute_idref(&self) -> String {
        format!("{}#{}", self.package, self.id)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.absolute_idref())
    }
}
