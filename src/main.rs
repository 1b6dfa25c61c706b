//! Headless dataset walker.
//!
//! `voai <manifest.json> <categories.json> [second.json] [third.json]`
//!
//! Opens the dataset with its taxonomies, loads the annotations of every
//! image and reports what it found. Preferences come from `$VOAI_CONFIG`
//! when set, otherwise from the default config path.

use std::path::PathBuf;

use voai::{AppConfig, CategoryLevel, NonInteractive, Session, SessionError, SessionSettings};

fn usage() -> String {
    "usage: voai <manifest.json> <categories.json> [second.json] [third.json]".to_string()
}

fn init_logging(config: &AppConfig) {
    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();
}

fn load_config() -> Result<AppConfig, SessionError> {
    match std::env::var_os("VOAI_CONFIG") {
        Some(path) => Ok(AppConfig::read(&PathBuf::from(path))?),
        None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn run(manifest: PathBuf, category_files: &[PathBuf]) -> Result<(), SessionError> {
    let config = load_config()?;
    init_logging(&config);

    let settings = SessionSettings::from(&config.preferences);
    let mut session = Session::new(settings, NonInteractive);

    let levels = CategoryLevel::all();
    for (level, path) in levels.iter().zip(category_files) {
        session.load_category_file(*level, path)?;
    }
    session.open_dataset(&manifest)?;

    let Some(total) = session.dataset().map(|d| d.len()) else {
        return Err(SessionError::NoDataset);
    };
    let mut annotated = 0;
    let mut shapes = 0;
    let mut failed = 0;
    for index in 0..total {
        if let Err(e) = session.open_image(index) {
            log::warn!("Skipping image {}: {}", index, e);
            failed += 1;
            continue;
        }
        let count = session.canvas().shapes().len();
        if count > 0 {
            annotated += 1;
            shapes += count;
        }
    }

    log::info!(
        "{} images, {} annotated, {} shapes, {} unreadable",
        total,
        annotated,
        shapes,
        failed
    );
    println!("images: {total}");
    println!("annotated: {annotated}");
    println!("shapes: {shapes}");
    if failed > 0 {
        println!("unreadable: {failed}");
    }
    Ok(())
}

fn main() {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let (Some(manifest), Some(primary)) = (args.next(), args.next()) else {
        eprintln!("{}", usage());
        std::process::exit(2);
    };
    let mut category_files = vec![primary];
    category_files.extend(args.take(2));

    if let Err(e) = run(manifest, &category_files) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
