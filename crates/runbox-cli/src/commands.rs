use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use runbox_server::{RunboxServer, ServerConfig};
use runbox_sync::{HttpTransport, KeyCache, PageLocation, StoreOutcome, StoreTransport, SyncEngine};
use runbox_types::{endpoints, CodeFile, FileSet, ReadKey};
use tracing::{debug, info};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Fetch(args) => cmd_fetch(args, &cli.format).await,
        Command::Save(args) => cmd_save(args, &cli.format).await,
        Command::Link(args) => cmd_link(args, &cli.format),
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "loading server config");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir;
    }
    let storage = match &config.data_dir {
        Some(dir) => dir.display().to_string(),
        None => "memory".into(),
    };
    println!(
        "runbox server on {} (storage: {})",
        config.bind_addr.to_string().bold(),
        storage
    );
    RunboxServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_fetch(args: FetchArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let read_key = ReadKey::parse(&args.read_key).context("invalid read key")?;
    let transport = HttpTransport::new(&args.server)?;
    let Some(files) = transport.fetch(&read_key).await? else {
        bail!("sandbox {read_key} not found");
    };
    match format {
        OutputFormat::Json => println!("{}", files.to_json()?),
        OutputFormat::Text => {
            let active = files.active().map(|f| f.name.clone());
            for file in files.iter() {
                let marker = if Some(&file.name) == active.as_ref() { "*" } else { " " };
                println!("{} {}", marker.green(), file.name.yellow().bold());
                println!("{}", file.content);
            }
        }
    }
    Ok(())
}

async fn cmd_save(args: SaveArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let files = read_files(&args.files)?;
    let location = match &args.read_key {
        Some(key) => {
            let key = ReadKey::parse(key).context("invalid read key")?;
            PageLocation::new(endpoints::store_path(&key))
        }
        None => PageLocation::new("/"),
    };
    let cache = KeyCache::load(&args.cache)
        .with_context(|| format!("reading key cache {}", args.cache.display()))?;
    debug!(path = %args.cache.display(), entries = cache.len(), "loaded key cache");
    if let Some(key) = location.read_key() {
        if !args.fork && cache.write_key(&key).is_none() {
            println!(
                "{} no write key cached for {}, creating a new sandbox",
                "!".yellow(),
                key.to_string().yellow()
            );
        }
    }

    let engine = SyncEngine::new(HttpTransport::new(&args.server)?, location).with_cache(cache);
    engine.set_save_enabled(true);
    let outcome = engine.store(&files, args.fork).await;
    // failed saves leave the cache as loaded
    engine
        .cache()
        .save(&args.cache)
        .with_context(|| format!("writing key cache {}", args.cache.display()))?;
    debug!(path = %args.cache.display(), "wrote key cache");
    let outcome = outcome?;

    let read_key = engine
        .current_read_key()
        .context("no sandbox after save")?;
    let url = format!("{}{}", args.server.trim_end_matches('/'), endpoints::store_path(&read_key));
    info!(%read_key, changed = outcome.is_some(), "save finished");
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "readKey": read_key.as_str(),
                "url": url,
                "created": outcome.as_ref().is_some_and(StoreOutcome::is_new_sandbox),
                "changed": outcome.is_some(),
            });
            println!("{json}");
        }
        OutputFormat::Text => {
            let message = outcome.as_ref().map_or("Up to date", StoreOutcome::message);
            println!("{} {}", "✓".green().bold(), message);
            println!("  Read key: {}", read_key.to_string().yellow());
            println!("  URL: {}", url.cyan());
        }
    }
    Ok(())
}

fn cmd_link(args: LinkArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let files = read_files(&args.files)?;
    let transport = HttpTransport::new(&args.server)?;
    let (url, read_key) = transport.import_link(&files)?;
    debug!(%read_key, files = files.len(), "built import link");
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "readKey": read_key.as_str(), "url": url.as_str() });
            println!("{json}");
        }
        OutputFormat::Text => {
            println!("{}", url.as_str().cyan());
            println!("  Resolves to: {}", endpoints::store_path(&read_key).yellow());
        }
    }
    Ok(())
}

/// Load local files into a file set; the first path is the active file.
fn read_files(paths: &[PathBuf]) -> anyhow::Result<FileSet> {
    let mut files = FileSet::default();
    for (i, path) in paths.iter().enumerate() {
        let name = file_name(path)?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let active_index = if i == 0 { 1 } else { 0 };
        files.push(CodeFile::new(name, content).with_active_index(active_index))?;
    }
    Ok(files)
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_files_marks_first_active() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.py");
        let util = dir.path().join("util.py");
        std::fs::write(&main, "import util").unwrap();
        std::fs::write(&util, "X = 1").unwrap();

        let files = read_files(&[main, util]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files.active().unwrap().name, "main.py");
        assert_eq!(files.get("util.py").unwrap().content, "X = 1");
    }

    #[test]
    fn read_files_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let first = dir.path().join("main.py");
        let second = dir.path().join("a").join("main.py");
        std::fs::write(&first, "").unwrap();
        std::fs::write(&second, "").unwrap();
        assert!(read_files(&[first, second]).is_err());
    }

    #[test]
    fn link_runs_offline() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.py");
        std::fs::write(&main, "print('shared')").unwrap();
        let args = LinkArgs {
            files: vec![main],
            server: DEFAULT_SERVER.into(),
        };
        cmd_link(args, &OutputFormat::Json).unwrap();
    }

    #[test]
    fn read_files_missing_file() {
        assert!(read_files(&[PathBuf::from("/definitely/not/here.py")]).is_err());
    }
}
