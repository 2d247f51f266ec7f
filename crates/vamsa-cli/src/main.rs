use serde::Serialize;
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::path::Path;
use vamsa_core::config::overrides_from_pairs;
use vamsa_core::{
    BuildOptions, DatasetFormat, ExpansionState, FamilyDataset, SkippedEdge, TreeEntry,
    VamsaConfig, build_tree_with,
};
use vamsa_render::{LayoutOptions, TreeView, layout_tree};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] vamsa_core::Error),
    #[error(transparent)]
    Render(#[from] vamsa_render::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset has problems (see report)")]
    DatasetIssues,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    Validate,
    #[default]
    Build,
    Layout,
    Render,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    format: Option<DatasetFormat>,
    config: Option<String>,
    root: Option<String>,
    root_policy: Option<&'static str>,
    expand: Vec<String>,
    expand_all: bool,
    select: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    overlay: bool,
    diagram_id: Option<String>,
    pretty: bool,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildOut<'a> {
    root: &'a str,
    nodes: usize,
    max_depth: usize,
    tree: Vec<TreeEntry>,
    skipped: &'a [SkippedEdge],
}

fn usage() -> &'static str {
    "vamsa-cli\n\
\n\
USAGE:\n\
  vamsa-cli validate [--format json|yaml] [--pretty] [<path>|-]\n\
  vamsa-cli build [--root <id>] [--root-policy first|ancestral] [--expand <id[,id...]>] [--expand-all] [--pretty] [<path>|-]\n\
  vamsa-cli layout [--config <file>] [--root <id>] [--root-policy first|ancestral] [--expand <id[,id...]>] [--expand-all] [--pretty] [<path>|-]\n\
  vamsa-cli render [--config <file>] [--root <id>] [--root-policy first|ancestral] [--expand <id[,id...]>] [--expand-all] [--select <id>] [--width <w>] [--height <h>] [--overlay] [--id <name>] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the dataset is read from stdin (JSON unless --format yaml).\n\
  - validate exits with status 1 when the report lists problems.\n\
  - build prints the tree as a flat list of rows (root first); layout prints node positions and edge curves as JSON.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - Logging goes to stderr; set VAMSA_LOG (or RUST_LOG), e.g. VAMSA_LOG=debug.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "validate" => args.command = Command::Validate,
            "build" => args.command = Command::Build,
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--overlay" => args.overlay = true,
            "--expand-all" => args.expand_all = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = Some(
                    fmt.parse::<DatasetFormat>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--root" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.root = Some(id.clone());
            }
            "--root-policy" => {
                let Some(policy) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.root_policy = match policy.as_str() {
                    "first" => Some("first"),
                    "ancestral" => Some("ancestral"),
                    _ => return Err(CliError::Usage(usage())),
                };
            }
            "--expand" => {
                let Some(ids) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.expand.extend(
                    ids.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string),
                );
            }
            "--select" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.select = Some(id.clone());
            }
            "--width" => {
                let Some(w) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.width = Some(w.parse::<f64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--height" => {
                let Some(h) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.height = Some(h.parse::<f64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.diagram_id = Some(id.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("VAMSA_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_dataset(input: Option<&str>, format: Option<DatasetFormat>) -> Result<FamilyDataset, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(FamilyDataset::from_str_with_format(
                &buf,
                format.unwrap_or_default(),
            )?)
        }
        Some(path) => {
            let format = format.unwrap_or_else(|| DatasetFormat::from_path(Path::new(path)));
            let text = std::fs::read_to_string(path)?;
            Ok(FamilyDataset::from_str_with_format(&text, format)?)
        }
    }
}

/// File config first, then command-line flags on top.
fn load_config(args: &Args) -> Result<VamsaConfig, CliError> {
    let base = match &args.config {
        Some(path) => VamsaConfig::from_path(path)?,
        None => VamsaConfig::default(),
    };

    let mut pairs: Vec<(&str, Value)> = Vec::new();
    if let Some(policy) = args.root_policy {
        pairs.push(("tree.rootPolicy", json!(policy)));
    }
    if let Some(id) = &args.root {
        pairs.push(("tree.rootPolicy", json!({ "member": id })));
    }
    if let Some(w) = args.width {
        pairs.push(("render.width", json!(w)));
    }
    if let Some(h) = args.height {
        pairs.push(("render.height", json!(h)));
    }
    if args.overlay {
        pairs.push(("render.showOverlay", json!(true)));
    }
    if pairs.is_empty() {
        return Ok(base);
    }
    Ok(base.merged(&overrides_from_pairs(pairs))?)
}

fn expansion_for(args: &Args, dataset: &FamilyDataset) -> ExpansionState {
    if args.expand_all {
        ExpansionState::expand_all(dataset.member_ids())
    } else {
        args.expand.iter().map(String::as_str).collect()
    }
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String, CliError> {
    let mut s = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    s.push('\n');
    Ok(s)
}

fn write_output(out: Option<&str>, text: &str) -> Result<(), CliError> {
    match out {
        Some(path) => {
            std::fs::write(path, text)?;
            tracing::info!(path, bytes = text.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let dataset = read_dataset(args.input.as_deref(), args.format)?;
    tracing::debug!(
        members = dataset.members.len(),
        relationships = dataset.relationships.len(),
        "dataset loaded"
    );

    match args.command {
        Command::Validate => {
            let report = dataset.validate();
            write_output(args.out.as_deref(), &to_json(&report, args.pretty)?)?;
            if report.is_clean() {
                Ok(())
            } else {
                Err(CliError::DatasetIssues)
            }
        }
        Command::Build => {
            let config = load_config(&args)?;
            let options = BuildOptions::default().with_root_policy(config.tree.root_policy);
            let expansion = expansion_for(&args, &dataset);
            let text = match build_tree_with(
                &dataset.members,
                &dataset.relationships,
                &expansion,
                &options,
            ) {
                Some(tree) => to_json(
                    &BuildOut {
                        root: &tree.root().id,
                        nodes: tree.len(),
                        max_depth: tree.max_depth(),
                        tree: tree.entries(&dataset.members),
                        skipped: tree.skipped_edges(),
                    },
                    args.pretty,
                )?,
                None => to_json(&Value::Null, args.pretty)?,
            };
            write_output(args.out.as_deref(), &text)
        }
        Command::Layout => {
            let config = load_config(&args)?;
            let options = BuildOptions::default().with_root_policy(config.tree.root_policy.clone());
            let layout_options = LayoutOptions::from_config(&config.layout, &config.render)?;
            let expansion = expansion_for(&args, &dataset);
            let layout = build_tree_with(
                &dataset.members,
                &dataset.relationships,
                &expansion,
                &options,
            )
            .map(|tree| layout_tree(&tree, &layout_options));
            write_output(args.out.as_deref(), &to_json(&layout, args.pretty)?)
        }
        Command::Render => {
            let config = load_config(&args)?;
            let expansion = expansion_for(&args, &dataset);
            let mut view = TreeView::new(config)?;
            if let Some(id) = &args.diagram_id {
                view.set_diagram_id(id.as_str());
            }
            view.set_members(dataset.members, &mut ());
            view.set_relationships(dataset.relationships, &mut ());
            view.set_expansion(expansion, &mut ());
            if let Some(id) = &args.select {
                view.on_node_click(id, &mut ());
                if view.selected().is_none() {
                    tracing::warn!(member = %id, "--select names an unknown member");
                }
            }
            write_output(args.out.as_deref(), &view.render_svg())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing();

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
