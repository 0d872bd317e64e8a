use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a file-like output produced during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Location of the output
    pub path: String,

    /// Format of the output, e.g. `markdown` or `json`
    pub format: String,

    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Language of the content, when relevant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Artifact {
    /// Create a new artifact reference
    pub fn new(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            label: None,
            language: None,
        }
    }

    /// Add a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a content language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Decode the `artifacts` field of a task result.
    ///
    /// An absent field is an empty collection.
    pub fn from_result(value: &Value) -> Result<Vec<Artifact>, serde_json::Error> {
        match value.get("artifacts") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(raw) => Vec::<Artifact>::deserialize(raw),
        }
    }
}

/// Append-only, order-preserving log of artifacts for one run.
///
/// There is no removal and no deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactLog {
    entries: Vec<Artifact>,
}

impl ArtifactLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one artifact
    pub fn push(&mut self, artifact: Artifact) {
        self.entries.push(artifact);
    }

    /// Append artifacts in the given order
    pub fn extend<I: IntoIterator<Item = Artifact>>(&mut self, artifacts: I) {
        self.entries.extend(artifacts);
    }

    /// Number of recorded artifacts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded artifacts in production order
    pub fn as_slice(&self) -> &[Artifact] {
        &self.entries
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<Artifact> {
        self.entries.clone()
    }
}
