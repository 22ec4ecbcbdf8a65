use anyhow::{Context, Result};
use clap::Parser;
use core_types::Location;
use dom::dom_utils::{outline, to_html};
use engine::{Controller, MemoryPreferences, PreferenceStore, TomlPreferences};
use net::HttpTranslator;
use platform::Session;
use rules::RuleStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const OUTLINE_CAP: usize = 200;

/// Localize a saved page the way the in-page engine would.
#[derive(Parser, Debug)]
#[command(name = "hanhua", version, about)]
struct Args {
    /// HTML file to localize.
    html: PathBuf,

    /// Location the page was served from; drives page classification.
    #[arg(long)]
    url: String,

    /// Dictionary JSON to use instead of the bundled one.
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Language key inside the dictionary.
    #[arg(long, default_value = "zh")]
    lang: String,

    /// Preference file; defaults to the user config directory.
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Flip the regex switch (persisted) before localizing.
    #[arg(long)]
    toggle_regex: bool,

    /// Press the translate control, if one is attached, and wait for it.
    #[arg(long)]
    enrich: bool,

    /// Print an outline of the result instead of HTML.
    #[arg(long)]
    outline: bool,
}

fn load_store(args: &Args) -> Result<RuleStore> {
    let Some(path) = &args.dict else {
        return RuleStore::bundled().context("bundled dictionary");
    };
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    RuleStore::from_json(&json, &args.lang)
        .and_then(RuleStore::with_builtins)
        .with_context(|| format!("loading dictionary {}", path.display()))
}

fn open_prefs(args: &Args) -> Result<Box<dyn PreferenceStore + Send>> {
    let path = args
        .prefs
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("hanhua").join("prefs.toml")));
    match path {
        Some(path) => {
            let prefs = TomlPreferences::open(&path)
                .with_context(|| format!("opening preferences {}", path.display()))?;
            Ok(Box::new(prefs))
        }
        None => {
            log::warn!("no config directory; preferences are not persisted");
            Ok(Box::new(MemoryPreferences::default()))
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let store = Arc::new(load_store(&args)?);
    let prefs = open_prefs(&args)?;
    let location = Location::parse(&args.url)?;
    let html = fs::read_to_string(&args.html)
        .with_context(|| format!("reading {}", args.html.display()))?;

    let mut doc = dom::parse_html(&html);
    doc.navigate(location);

    let controller = Controller::new(store, prefs);
    let mut session = Session::new(doc, controller, Arc::new(HttpTranslator::new()));
    if args.toggle_regex {
        session.toggle_regex();
        for notice in session.notices() {
            eprintln!("{notice}");
        }
    }
    session.start();

    match session.controller().state().context.as_ref() {
        Some(context) => log::info!("page context: {context}"),
        None => log::info!("page context unknown; only the title was considered"),
    }

    if args.enrich {
        let doc = session.document();
        let control = doc
            .descendants(doc.root())
            .find(|&n| doc.attribute(n, "id") == Some(engine::enrich::CONTROL_ELEMENT_ID));
        match control {
            Some(control) => session.click(control),
            None => log::warn!("no translate control on this page"),
        }
    }

    let doc = session.into_document();
    if args.outline {
        for line in outline(&doc, OUTLINE_CAP) {
            println!("{line}");
        }
    } else {
        println!("{}", to_html(&doc, doc.root()));
    }
    Ok(())
}
