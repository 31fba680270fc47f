use std::path::Path;

use kdam::{BarExt, tqdm};
use rayon::prelude::*;

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    record::ProblemRecord,
    vector_store::{CollectionLookup, Distance, StoredPoint, VectorStore},
    walker::{self, CorpusFile},
};

/// Parameters for a single ingestion run.
#[derive(Debug, Clone)]
pub struct IngestParams<'a> {
    pub collection: &'a str,
    pub corpus_root: &'a Path,
    pub show_progress: bool,
}

/// What an ingestion run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The collection already held data; nothing was embedded or written.
    AlreadyPopulated { points: u64 },
    /// The corpus was embedded and written. `points` may be zero.
    Ingested { points: usize, subjects: usize },
}

/// Embed every problem under `corpus_root` into `collection`.
///
/// The collection is created on first use with the embedder's dimension and
/// cosine distance. If it already holds any point the run is a no-op, so
/// repeated runs never duplicate data. Otherwise every record is loaded
/// before anything is embedded: one bad file aborts the whole run with the
/// collection left empty. Ids are assigned `0..n` in discovery order and all
/// points are written in a single upsert.
pub fn ingest<S, E>(
    store: &S,
    embedder: &mut E,
    params: &IngestParams<'_>,
) -> Result<IngestOutcome>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    let info = match store.collection_info(params.collection)? {
        CollectionLookup::Exists(info) => info,
        CollectionLookup::NotFound => {
            let dimension = embedder.dimension()?;
            let info = store.create_collection(
                params.collection,
                dimension,
                Distance::Cosine,
            )?;
            tracing::info!(
                collection = params.collection,
                model = embedder.model_id(),
                dimension,
                "created collection"
            );
            info
        }
    };

    if info.point_count > 0 {
        tracing::info!(
            collection = params.collection,
            points = info.point_count,
            "collection already populated, skipping ingestion"
        );
        return Ok(IngestOutcome::AlreadyPopulated {
            points: info.point_count,
        });
    }

    let dimension = embedder.dimension()?;
    if dimension != info.dimension {
        return Err(Error::DimensionMismatch {
            expected: info.dimension,
            actual: dimension,
        });
    }

    let files = walker::discover_corpus(params.corpus_root)?;
    let subjects = walker::count_subjects(&files);
    tracing::info!(
        files = files.len(),
        subjects,
        "discovered corpus files"
    );

    if files.is_empty() {
        tracing::info!(
            root = %params.corpus_root.display(),
            "no problem files found"
        );
        return Ok(IngestOutcome::Ingested {
            points: 0,
            subjects: 0,
        });
    }

    let records = load_records(&files)?;
    let points = embed_records(embedder, records, params.show_progress)?;

    let written = store.upsert(params.collection, &points)?;
    tracing::info!(
        collection = params.collection,
        points = written,
        "ingestion complete"
    );

    Ok(IngestOutcome::Ingested {
        points: written,
        subjects,
    })
}

/// Read every corpus file, failing on the first bad record.
fn load_records(files: &[CorpusFile]) -> Result<Vec<ProblemRecord>> {
    files
        .par_iter()
        .map(|file| ProblemRecord::load(&file.path, &file.subject))
        .collect()
}

fn embed_records<E: Embedder + ?Sized>(
    embedder: &mut E,
    records: Vec<ProblemRecord>,
    show_progress: bool,
) -> Result<Vec<StoredPoint>> {
    let mut bar = show_progress.then(|| {
        tqdm!(total = records.len(), desc = "Embedding problems", unit = " problems")
    });

    let mut points = Vec::with_capacity(records.len());
    let mut current_subject = String::new();

    for (id, record) in records.into_iter().enumerate() {
        if let Some(bar) = bar.as_mut()
            && record.subject != current_subject
        {
            current_subject.clone_from(&record.subject);
            bar.set_postfix(format!("subject={current_subject}"));
        }

        let vector = embedder.embed(&record.embedding_text())?;
        points.push(StoredPoint {
            id: id as u64,
            vector,
            payload: record,
        });

        if let Some(bar) = bar.as_mut() {
            bar.update(1)?;
        }
    }

    if bar.is_some() {
        eprintln!();
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        embedding::KeywordEmbedder,
        point_db::PointDb,
        vector_store::CollectionInfo,
    };

    const COLLECTION: &str = "math_problems";

    fn write_problem(
        root: &Path,
        subject: &str,
        name: &str,
        problem: &str,
        solution: &str,
    ) {
        let dir = root.join(subject);
        std::fs::create_dir_all(&dir).unwrap();
        let body = serde_json::json!({
            "problem": problem,
            "solution": solution,
            "level": "Level 1",
            "type": "Test",
        });
        std::fs::write(dir.join(name), body.to_string()).unwrap();
    }

    fn setup() -> (tempfile::TempDir, PointDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = PointDb::open(&tmp.path().join("points.redb")).unwrap();
        (tmp, db)
    }

    fn params(root: &Path) -> IngestParams<'_> {
        IngestParams {
            collection: COLLECTION,
            corpus_root: root,
            show_progress: false,
        }
    }

    fn info(db: &PointDb) -> CollectionInfo {
        match db.collection_info(COLLECTION).unwrap() {
            CollectionLookup::Exists(info) => info,
            CollectionLookup::NotFound => panic!("collection missing"),
        }
    }

    #[test]
    fn ingests_all_subjects() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "Solve x+1=2", "x=1");
        write_problem(&corpus, "algebra", "2.json", "Solve 2x=4", "x=2");
        write_problem(&corpus, "geometry", "1.json", "Area of a square", "s^2");

        let mut embedder = KeywordEmbedder::new(16);
        let outcome = ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::Ingested {
                points: 3,
                subjects: 2
            }
        );
        let info = info(&db);
        assert_eq!(info.point_count, 3);
        assert_eq!(info.dimension, 16);
        assert_eq!(info.distance, Distance::Cosine);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "p", "s");
        write_problem(&corpus, "algebra", "2.json", "q", "t");

        let mut embedder = KeywordEmbedder::new(16);
        ingest(&db, &mut embedder, &params(&corpus)).unwrap();
        let calls_after_first = embedder.calls;

        write_problem(&corpus, "algebra", "3.json", "r", "u");
        let outcome = ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        assert_eq!(outcome, IngestOutcome::AlreadyPopulated { points: 2 });
        assert_eq!(info(&db).point_count, 2);
        assert_eq!(embedder.calls, calls_after_first);
    }

    #[test]
    fn ids_cover_zero_to_n() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        for subject in ["algebra", "geometry", "number_theory"] {
            for i in 0..3 {
                write_problem(
                    &corpus,
                    subject,
                    &format!("{i}.json"),
                    &format!("{subject} problem {i}"),
                    "answer",
                );
            }
        }

        let mut embedder = KeywordEmbedder::new(32);
        ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        let query = embedder.embed("problem").unwrap();
        let mut ids: Vec<u64> = db
            .search(COLLECTION, &query, 100)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..9).collect::<Vec<u64>>());
    }

    #[test]
    fn payload_carries_subject_and_filename() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "precalculus", "77.json", "Compute sin 30", "1/2");

        let mut embedder = KeywordEmbedder::new(16);
        ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        let query = embedder.embed("sin").unwrap();
        let hit = &db.search(COLLECTION, &query, 1).unwrap()[0];
        assert_eq!(hit.id, 0);
        assert_eq!(hit.payload.subject, "precalculus");
        assert_eq!(hit.payload.filename, "77.json");
        assert_eq!(hit.payload.level, "Level 1");
        assert_eq!(hit.payload.kind, "Test");
    }

    #[test]
    fn empty_corpus_creates_empty_collection() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("empty_dir");
        std::fs::create_dir(&corpus).unwrap();

        let mut embedder = KeywordEmbedder::new(8);
        let outcome = ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::Ingested {
                points: 0,
                subjects: 0
            }
        );
        assert_eq!(info(&db).point_count, 0);
    }

    #[test]
    fn missing_corpus_root_is_not_fatal() {
        let (tmp, db) = setup();
        let mut embedder = KeywordEmbedder::new(8);
        let missing = tmp.path().join("nope");

        let outcome = ingest(&db, &mut embedder, &params(&missing)).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Ingested {
                points: 0,
                subjects: 0
            }
        );
    }

    #[test]
    fn missing_solution_aborts_without_writing() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "p", "s");
        std::fs::write(
            corpus.join("algebra").join("2.json"),
            r#"{"problem": "no solution here"}"#,
        )
        .unwrap();

        let mut embedder = KeywordEmbedder::new(8);
        let result = ingest(&db, &mut embedder, &params(&corpus));

        assert!(matches!(
            result,
            Err(Error::MissingField {
                field: "solution",
                ..
            })
        ));
        assert_eq!(embedder.calls, 0);
        assert_eq!(info(&db).point_count, 0);
    }

    #[test]
    fn malformed_json_aborts() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "p", "s");
        std::fs::write(corpus.join("algebra").join("2.json"), "[1, 2").unwrap();

        let mut embedder = KeywordEmbedder::new(8);
        assert!(matches!(
            ingest(&db, &mut embedder, &params(&corpus)),
            Err(Error::MalformedRecord { .. })
        ));
    }

    #[test]
    fn empty_collection_with_other_dimension_is_rejected() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "p", "s");
        db.create_collection(COLLECTION, 4, Distance::Cosine).unwrap();

        let mut embedder = KeywordEmbedder::new(8);
        assert!(matches!(
            ingest(&db, &mut embedder, &params(&corpus)),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 8
            })
        ));
    }

    #[test]
    fn existing_empty_collection_gets_filled() {
        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "p", "s");
        db.create_collection(COLLECTION, 8, Distance::Cosine).unwrap();

        let mut embedder = KeywordEmbedder::new(8);
        let outcome = ingest(&db, &mut embedder, &params(&corpus)).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Ingested {
                points: 1,
                subjects: 1
            }
        );
    }

    #[test]
    fn single_record_is_found_by_search() {
        use crate::search::{SearchParams, search};

        let (tmp, db) = setup();
        let corpus = tmp.path().join("train");
        write_problem(&corpus, "algebra", "1.json", "What is 2+2?", "4");

        let mut embedder = KeywordEmbedder::new(16);
        ingest(&db, &mut embedder, &params(&corpus)).unwrap();

        let results = search(
            &db,
            &mut embedder,
            &SearchParams {
                collection: COLLECTION,
                query: "2+2",
                top_k: 1,
            },
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].payload.problem, "What is 2+2?");
        assert_eq!(results[0].payload.subject, "algebra");
    }
}
