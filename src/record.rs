use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One labeled math problem from the corpus.
///
/// `subject` comes from the enclosing folder and `filename` from the source
/// file; everything else is read from the JSON body. The same shape is
/// stored as the payload of every point and returned with search hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub problem: String,
    pub solution: String,
    #[serde(default)]
    pub level: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub filename: String,
}

/// On-disk shape of a corpus file. Required keys are optional here so a
/// missing key can be reported by name instead of as a serde message.
#[derive(Debug, Deserialize)]
struct RawRecord {
    problem: Option<String>,
    solution: Option<String>,
    level: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ProblemRecord {
    /// Read a problem record from a JSON file.
    ///
    /// `problem` and `solution` must be present and non-null; `level` and
    /// `type` fall back to the empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use mathsearch::record::ProblemRecord;
    ///
    /// let path = tmp.path().join("1.json");
    /// std::fs::write(&path, r#"{"problem": "What is 2+2?", "solution": "4"}"#).unwrap();
    ///
    /// let record = ProblemRecord::load(&path, "algebra").unwrap();
    /// assert_eq!(record.subject, "algebra");
    /// assert_eq!(record.filename, "1.json");
    /// assert_eq!(record.level, "");
    /// ```
    pub fn load(path: &Path, subject: &str) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let raw: RawRecord = serde_json::from_slice(&bytes).map_err(|source| {
            Error::MalformedRecord {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let problem = raw.problem.ok_or_else(|| Error::MissingField {
            path: path.to_path_buf(),
            field: "problem",
        })?;
        let solution = raw.solution.ok_or_else(|| Error::MissingField {
            path: path.to_path_buf(),
            field: "solution",
        })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            problem,
            solution,
            level: raw.level.unwrap_or_default(),
            kind: raw.kind.unwrap_or_default(),
            subject: subject.to_string(),
            filename,
        })
    }

    /// The text that gets embedded for this record.
    pub fn embedding_text(&self) -> String {
        format!("Problem: {} Solution: {}", self.problem, self.solution)
    }
}
