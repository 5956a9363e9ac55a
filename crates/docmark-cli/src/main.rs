use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docmark_config::Config;
use docmark_engine::autocomplete::AttributeCatalog;
use docmark_engine::schema::StructuralRole;
use docmark_engine::{
    AttributeCursor, Editor, EditorOptions, Node, Selection, markdoc_schema, parse, serialize,
};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod io;

#[derive(Debug, Parser)]
#[command(name = "docmark", version, about = "Format, check and annotate docmark files")]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/docmark/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the normalized markup of a file
    Fmt {
        file: PathBuf,
        /// Save the result back to the file
        #[arg(long)]
        write: bool,
    },
    /// Report markup problems; exits non-zero when there are any
    Check { file: PathBuf },
    /// Dump the document tree as JSON
    Tree { file: PathBuf },
    /// Add an attribute to a top-level block
    Annotate {
        file: PathBuf,
        /// Zero-based index of the top-level block
        #[arg(long, default_value_t = 0)]
        block: usize,
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "")]
        value: String,
        /// Save the result back to the file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let content_dir = config.content_dir.as_deref();

    match cli.command {
        Command::Fmt { file, write } => {
            let path = io::resolve(&file, content_dir)?;
            let out = format_markup(&io::read_file(&path)?)?;
            emit(&path, &out, write)?;
        }
        Command::Check { file } => {
            let path = io::resolve(&file, content_dir)?;
            let problems = check_markup(&io::read_file(&path)?)?;
            for problem in &problems {
                println!("{}:{problem}", path.display());
            }
            if !problems.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Tree { file } => {
            let path = io::resolve(&file, content_dir)?;
            println!("{}", tree_json(&io::read_file(&path)?)?);
        }
        Command::Annotate {
            file,
            block,
            key,
            value,
            write,
        } => {
            let path = io::resolve(&file, content_dir)?;
            let out = annotate(&io::read_file(&path)?, &config, block, &key, &value)?;
            emit(&path, &out, write)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map_or_else(Config::config_path, Path::to_path_buf);
    debug!("Config path: {}", config_path.display());
    let loaded = Config::load_from_path(&config_path)?;
    if loaded.is_none() {
        if path.is_some() {
            bail!("config file {} not found", config_path.display());
        }
        info!("No config file at {}, using defaults", config_path.display());
    }
    Ok(loaded.unwrap_or_default())
}

fn emit(path: &Path, out: &str, write: bool) -> Result<()> {
    if write {
        io::write_file(path, out)?;
        info!("Wrote {}", path.display());
    } else {
        print!("{out}");
    }
    Ok(())
}

fn editor_options(config: &Config) -> EditorOptions {
    let catalog = config.attributes.nodes.iter().fold(
        AttributeCatalog::new(config.attributes.global.clone()),
        |catalog, (node_type, keys)| catalog.with_node(node_type.clone(), keys.clone()),
    );
    EditorOptions {
        trigger: config.editor.trigger,
        max_candidates: config.editor.max_candidates,
        catalog,
    }
}

fn format_markup(source: &str) -> Result<String> {
    let schema = markdoc_schema()?;
    let parsed = parse(&schema, source)?;
    Ok(serialize(&parsed.doc)?)
}

/// One `line:problem` entry per diagnostic.
fn check_markup(source: &str) -> Result<Vec<String>> {
    let schema = markdoc_schema()?;
    let parsed = parse(&schema, source)?;
    Ok(parsed
        .diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.line_in(source), d.problem))
        .collect())
}

fn tree_json(source: &str) -> Result<String> {
    let schema = markdoc_schema()?;
    let parsed = parse(&schema, source)?;
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "doc": parsed.doc.to_json(),
        "diagnostics": parsed.diagnostics,
    }))?)
}

/// Puts an attribute cursor before top-level block `block`, adds `key` and
/// types `value` into it.
fn annotate(source: &str, config: &Config, block: usize, key: &str, value: &str) -> Result<String> {
    let schema = markdoc_schema()?;
    let doc = parse(&schema, source)?.doc;
    let pos = block_start(&doc, block)?;
    let selection = match AttributeCursor::at(&doc.resolve(pos)?) {
        Some(cursor) => Selection::AttributeCursor(cursor),
        None => {
            // an annotated block gets the new key in its existing attributes
            let container = schema.role_type(StructuralRole::AttributesContainer)?;
            let node = doc.child(block);
            let attributes = node
                .first_child()
                .filter(|_| node.node_type().id() == container.id())
                .with_context(|| format!("block {block} cannot take attributes"))?;
            Selection::caret(pos + 1 + attributes.node_size() + 1)
        }
    };

    let mut editor = Editor::new(schema, doc, editor_options(config))?;
    editor.set_selection(selection)?;
    if !editor.add_attribute(key)?.is_handled() {
        bail!("block {block} cannot take attributes");
    }
    if !value.is_empty() {
        editor.handle_text_input(value)?;
    }
    Ok(serialize(editor.doc())?)
}

fn block_start(doc: &Node, block: usize) -> Result<usize> {
    if block >= doc.child_count() {
        bail!(
            "block {block} does not exist, the document has {}",
            doc.child_count()
        );
    }
    Ok(doc.content().iter().take(block).map(Node::node_size).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_fmt_normalizes() {
        let out = format_markup("# Heading\nSome *text*.").unwrap();
        assert_eq!(out, "# Heading\n\nSome *text*.\n");
    }

    #[test]
    fn test_check_lists_problems_by_line() {
        let problems = check_markup("fine\n\n```\nnever closed").unwrap();
        assert_eq!(problems, vec!["3: code fence is never closed"]);
        assert!(check_markup("fine\n").unwrap().is_empty());
    }

    #[test]
    fn test_tree_includes_diagnostics() {
        let json: serde_json::Value = serde_json::from_str(&tree_json("hi").unwrap()).unwrap();
        assert_eq!(json["doc"]["type"], "doc");
        assert_eq!(json["diagnostics"], serde_json::json!([]));
    }

    #[test]
    fn test_annotate_second_block() {
        let out = annotate("one\n\ntwo\n", &Config::default(), 1, "id", "second").unwrap();
        assert_eq!(out, "one\n\ntwo {% id=\"second\" %}\n");
    }

    #[test]
    fn test_annotate_block_that_already_has_attributes() {
        let source = "two {% id=\"a\" %}\n";
        let out = annotate(source, &Config::default(), 0, "class", "x").unwrap();
        assert_eq!(out, "two {% id=\"a\" class=\"x\" %}\n");
        let out = annotate(source, &Config::default(), 0, "id", "b").unwrap();
        assert_eq!(out, "two {% id=\"b\" %}\n");
    }

    #[test]
    fn test_annotate_rejects_blocks_without_attributes() {
        assert!(annotate("---\n", &Config::default(), 0, "id", "x").is_err());
        assert!(annotate("one\n", &Config::default(), 3, "id", "x").is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_config(Some(&temp_dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_fmt_write_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("doc.md");
        io::write_file(&file, "+ a\n+ b").unwrap();

        let out = format_markup(&io::read_file(&file).unwrap()).unwrap();
        emit(&file, &out, true).unwrap();

        assert_eq!(io::read_file(&file).unwrap(), "- a\n- b\n");
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.editor.trigger = '@';
        config
            .attributes
            .nodes
            .insert("heading".to_string(), vec!["level".to_string()]);

        let options = editor_options(&config);

        assert_eq!(options.trigger, '@');
        let keys: Vec<String> = options
            .catalog
            .keys_for("heading")
            .into_iter()
            .map(|k| k.key)
            .collect();
        assert!(keys.contains(&"level".to_string()));
        assert!(keys.contains(&"id".to_string()));
    }
}
