// Configuration issues and the instance paths they point at

use serde::Serialize;
use std::fmt;

/// The category of a [`ConfigIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    MissingRequired,
    WrongType,
    ConstraintViolation,
    ParseError,
    ProviderError,
    UniquenessViolation,
    MergeError,
}

impl IssueKind {
    /// Get the error code for this kind of issue
    pub fn error_code(&self) -> &'static str {
        match self {
            IssueKind::MissingRequired => "E-4-1",
            IssueKind::WrongType => "E-4-2",
            IssueKind::ConstraintViolation => "E-4-3",
            IssueKind::UniquenessViolation => "E-4-4",
            IssueKind::ParseError => "E-1-1",
            IssueKind::ProviderError => "E-2-1",
            IssueKind::MergeError => "E-3-1",
        }
    }

    /// Short title used as the diagnostic headline
    pub fn title(&self) -> &'static str {
        match self {
            IssueKind::MissingRequired => "Missing Required Setting",
            IssueKind::WrongType => "Wrong Setting Type",
            IssueKind::ConstraintViolation => "Setting Constraint Violated",
            IssueKind::UniquenessViolation => "Duplicate Entry",
            IssueKind::ParseError => "Invalid Meta Configuration",
            IssueKind::ProviderError => "Configuration Provider Failed",
            IssueKind::MergeError => "Configuration Merge Failed",
        }
    }
}

/// A single problem found while resolving configuration.
///
/// Validation reports every issue it finds, so a resolution failure usually
/// carries several of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigIssue {
    pub kind: IssueKind,
    #[serde(rename = "pathSegments")]
    pub path: InstancePath,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(kind: IssueKind, path: InstancePath, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// An issue that is not tied to any location in the configuration tree.
    pub fn at_root(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, InstancePath::new(), message)
    }

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Location of a value inside the configuration tree
/// (e.g. `["datasets", 0, "uri"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A copy of this path extended by one key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push_key(key);
        path
    }
}

impl From<Vec<PathSegment>> for InstancePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

/// Renders as `datasets[0].uri`, or `(root)` for the empty path.
impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(root)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A segment in an instance path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_path_display() {
        let mut path = InstancePath::new();
        assert_eq!(path.to_string(), "(root)");
        path.push_key("datasets");
        path.push_index(2);
        path.push_key("uri");
        assert_eq!(path.to_string(), "datasets[2].uri");
        assert_eq!(path.pop(), Some(PathSegment::Key("uri".into())));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_issue_serializes_with_path_segments() {
        let issue = ConfigIssue::new(
            IssueKind::UniquenessViolation,
            InstancePath::from(vec![PathSegment::Key("dacs".into()), PathSegment::Index(1)]),
            "duplicate id",
        );
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            serde_json::json!({
                "kind": "UNIQUENESS_VIOLATION",
                "pathSegments": ["dacs", 1],
                "message": "duplicate id"
            })
        );
        assert_eq!(issue.to_string(), "dacs[1]: duplicate id");
    }

    #[test]
    fn test_root_issue_display_has_no_prefix() {
        let issue = ConfigIssue::at_root(IssueKind::ProviderError, "boom");
        assert_eq!(issue.to_string(), "boom");
        assert_eq!(issue.error_code(), "E-2-1");
    }
}
