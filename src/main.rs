use clap::Parser;
use mathsearch::{
    DataDir,
    ModelManager,
    PointDb,
    Settings,
    cli::{self, Cli, Command},
    config::Overrides,
    error,
    ingest::{self, IngestOutcome, IngestParams},
    mcp,
    search::{self, SearchParams},
    vector_store::{CollectionLookup, VectorStore},
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("MATHSEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let corpus_override = match &cli.command {
        Command::Ingest(args) => args.corpus.as_deref(),
        _ => None,
    };
    let settings = Settings::resolve(Overrides {
        model: cli.model.as_deref(),
        collection: cli.collection.as_deref(),
        corpus_root: corpus_override,
    });

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = PointDb::open(&data_dir.points_db())?;

    match cli.command {
        Command::Ingest(args) => {
            cmd_ingest(&store, &settings, &args)?;
        }
        Command::Search(args) => {
            cmd_search(&store, &settings, &args)?;
        }
        Command::Status(args) => {
            cmd_status(&store, &data_dir, &settings, args.json)?;
        }
        Command::Reset(args) => {
            cmd_reset(&store, &settings, &args)?;
        }
        Command::Mcp => {
            let model = ModelManager::with_model_id(settings.model_id);
            mcp::run_mcp(store, settings.collection, Box::new(model))?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_ingest(
    store: &PointDb,
    settings: &Settings,
    args: &cli::IngestArgs,
) -> error::Result<()> {
    let mut model = ModelManager::with_model_id(settings.model_id.clone());
    let outcome = ingest::ingest(
        store,
        &mut model,
        &IngestParams {
            collection: &settings.collection,
            corpus_root: &settings.corpus_root,
            show_progress: !args.no_progress,
        },
    )?;

    match outcome {
        IngestOutcome::AlreadyPopulated { points } => {
            println!(
                "Collection '{}' already contains {points} points, skipping ingestion",
                settings.collection
            );
            println!("Run `mathsearch reset --yes` to rebuild it.");
        }
        IngestOutcome::Ingested { points: 0, .. } => {
            println!(
                "No problems found under {}",
                settings.corpus_root.display()
            );
        }
        IngestOutcome::Ingested { points, subjects } => {
            println!(
                "Ingested {points} problems from {subjects} subjects into '{}'",
                settings.collection
            );
        }
    }
    Ok(())
}

fn cmd_search(
    store: &PointDb,
    settings: &Settings,
    args: &cli::SearchArgs,
) -> error::Result<()> {
    let mut model = ModelManager::with_model_id(settings.model_id.clone());
    let results = search::search(
        store,
        &mut model,
        &SearchParams {
            collection: &settings.collection,
            query: &args.query,
            top_k: args.count as usize,
        },
    )?;

    if args.json {
        search::format_json(&results, &args.query)?;
    } else {
        search::format_human(&results, &args.query);
    }
    Ok(())
}

fn cmd_status(
    store: &PointDb,
    data_dir: &DataDir,
    settings: &Settings,
    json: bool,
) -> error::Result<()> {
    let current = match store.collection_info(&settings.collection)? {
        CollectionLookup::Exists(info) => Some(info),
        CollectionLookup::NotFound => None,
    };
    let collections = store.list_collections()?;

    if json {
        let status = serde_json::json!({
            "dataDir": data_dir.root().display().to_string(),
            "model": settings.model_id,
            "collection": settings.collection,
            "current": current,
            "collections": collections,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Data directory: {}", data_dir.root().display());
    println!("Model: {}", settings.model_id);
    match current {
        Some(info) => println!(
            "Collection: {} ({} points, dimension {}, {:?})",
            info.name, info.point_count, info.dimension, info.distance
        ),
        None => println!(
            "Collection: {} (not created yet)",
            settings.collection
        ),
    }

    if collections.is_empty() {
        println!("No collections stored.");
    } else {
        println!("Stored collections:");
        for info in &collections {
            println!("  {}\t{}", info.name, info.point_count);
        }
    }
    Ok(())
}

fn cmd_reset(
    store: &PointDb,
    settings: &Settings,
    args: &cli::ResetArgs,
) -> error::Result<()> {
    if !args.yes {
        return Err(error::Error::InvalidArgument(format!(
            "refusing to delete collection '{}' without --yes",
            settings.collection
        )));
    }

    if !store.drop_collection(&settings.collection)? {
        return Err(error::Error::NotFound {
            kind: "collection",
            name: settings.collection.clone(),
        });
    }

    println!("Deleted collection '{}'", settings.collection);
    Ok(())
}
