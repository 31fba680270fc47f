use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::error::Result;

/// A problem file found under a subject folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Name of the enclosing subject folder.
    pub subject: String,
    /// File name within the subject folder.
    pub filename: String,
    /// Full path to the file.
    pub path: PathBuf,
}

const RECORD_EXTENSION: &str = "json";

/// Discover problem files laid out as `root/<subject>/*.json`.
///
/// Hidden entries are skipped, as are files sitting directly under `root`
/// and anything nested below a subject folder. A missing root is not an
/// error: it yields no files. Results are sorted by subject, then file
/// name.
pub fn discover_corpus(root: &Path) -> Result<Vec<CorpusFile>> {
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "corpus root not found");
        return Ok(Vec::new());
    }

    let mut results = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let subject = entry.file_name().to_string_lossy().to_string();
        if subject.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        for file in std::fs::read_dir(entry.path())? {
            let file = file?;
            let filename = file.file_name().to_string_lossy().to_string();
            let path = file.path();

            if filename.starts_with('.') || !path.is_file() || !is_record(&path)
            {
                continue;
            }

            results.push(CorpusFile {
                subject: subject.clone(),
                filename,
                path,
            });
        }
    }

    results.sort_by(|a, b| {
        a.subject
            .cmp(&b.subject)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    Ok(results)
}

/// Number of distinct subjects among the discovered files.
pub fn count_subjects(files: &[CorpusFile]) -> usize {
    files
        .iter()
        .map(|f| f.subject.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

fn is_record(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == RECORD_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[CorpusFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| format!("{}/{}", f.subject, f.filename))
            .collect()
    }

    #[test]
    fn discovers_json_in_subject_folders() {
        let tmp = tempfile::tempdir().unwrap();
        let algebra = tmp.path().join("algebra");
        std::fs::create_dir(&algebra).unwrap();
        std::fs::write(algebra.join("1.json"), "{}").unwrap();
        std::fs::write(algebra.join("notes.txt"), "ignored").unwrap();

        let files = discover_corpus(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["algebra/1.json"]);
        assert_eq!(files[0].path, algebra.join("1.json"));
    }

    #[test]
    fn ignores_top_level_files_and_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("stray.json"), "{}").unwrap();
        let nested = tmp.path().join("geometry").join("extra");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("deep.json"), "{}").unwrap();

        let files = discover_corpus(tmp.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let hidden = tmp.path().join(".cache");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("1.json"), "{}").unwrap();
        let algebra = tmp.path().join("algebra");
        std::fs::create_dir(&algebra).unwrap();
        std::fs::write(algebra.join(".2.json"), "{}").unwrap();
        std::fs::write(algebra.join("3.json"), "{}").unwrap();

        let files = discover_corpus(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["algebra/3.json"]);
    }

    #[test]
    fn sorted_by_subject_then_filename() {
        let tmp = tempfile::tempdir().unwrap();
        for subject in ["precalculus", "algebra"] {
            let dir = tmp.path().join(subject);
            std::fs::create_dir(&dir).unwrap();
            for name in ["b.json", "a.json"] {
                std::fs::write(dir.join(name), "{}").unwrap();
            }
        }

        let files = discover_corpus(tmp.path()).unwrap();
        assert_eq!(
            names(&files),
            vec![
                "algebra/a.json",
                "algebra/b.json",
                "precalculus/a.json",
                "precalculus/b.json",
            ]
        );
        assert_eq!(count_subjects(&files), 2);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let files = discover_corpus(&tmp.path().join("does-not-exist")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn empty_subject_folder() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("algebra")).unwrap();
        let files = discover_corpus(tmp.path()).unwrap();
        assert!(files.is_empty());
        assert_eq!(count_subjects(&files), 0);
    }
}
