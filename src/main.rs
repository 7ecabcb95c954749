use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use gj::config::load_config;
use gj::editor::open_in_editor;
use gj::gateway::IdUtils;
use gj::highlight::painter_for;
use gj::matches::Match;
use gj::resolver::find_declaration_or_definition;
use gj::search::{find_matches, Query};
use gj::session::{Selection, Session};
use gj::symbols::{find_symbols, Layout};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Parser)]
#[command(name = "gj")]
#[command(version)]
#[command(about = "Interactive code navigator on top of an id-utils index")]
struct Cli {
    /// Patterns to look up. The first one queries the index; the rest narrow the result
    /// (prefix with `~` to exclude lines containing the word).
    #[arg(value_name = "PATTERN", required_unless_present = "index")]
    patterns: Vec<String>,

    /// Build the index (runs `mkid`) in the current directory and exit
    #[arg(short = 'i', long)]
    index: bool,

    /// Show likely declarations/definitions only. Repeat (-dd) to also require a matching filename.
    #[arg(short = 'd', long = "definition", action = ArgAction::Count)]
    definition: u8,

    /// List symbols matching the pattern together with the files referencing them
    #[arg(short = 's', long)]
    symbol: bool,

    /// With --symbol: include referencing files even without a path pattern
    #[arg(short = 'v', long)]
    verbose: bool,

    /// With --symbol: keep only references whose path contains this text
    #[arg(long, value_name = "TEXT")]
    path_pattern: Option<String>,

    /// Keep only matches in files whose path starts with PREFIX
    #[arg(short = 'p', long, value_name = "PREFIX")]
    path_prefix: Option<String>,

    /// Keep only matches in files that also mention PATTERN
    #[arg(short = 'f', long, value_name = "PATTERN")]
    filter: Option<String>,

    /// Disable colors
    #[arg(long)]
    no_color: bool,
}

fn run_navigator(session: &mut Session<'_>, mut matches: Vec<Match>, mut patterns: Vec<String>, editor: &str) -> Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut stdout = std::io::stdout();
    let mut last_n = None;

    loop {
        let outcome = session.filter_until_select(matches, patterns, last_n, &mut input, &mut stdout)?;
        matches = outcome.matches;
        patterns = outcome.patterns;

        match outcome.selection {
            Selection::Aborted => return Ok(()),
            Selection::Invalid => continue,
            Selection::Picked { indices, targets } => {
                for m in &targets {
                    if let Err(e) = open_in_editor(editor, m) {
                        eprintln!("{e:#}");
                    }
                }
                last_n = indices.last().copied();
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let repo_root = std::env::current_dir().context("Failed to get current dir")?;
    let cfg = load_config(&repo_root);
    let gateway = IdUtils::new(&cfg.tools);

    if cli.index {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner.set_message("building index...");
        let output = gateway.build_index()?;
        spinner.finish_with_message(format!("index written to {}", repo_root.join("ID").display()));
        if !output.trim().is_empty() {
            println!("{}", output.trim_end());
        }
        return Ok(());
    }

    if let Err(e) = gateway.check_install() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let painter = painter_for(cfg.display.color && !cli.no_color);

    if cli.symbol {
        let layout = Layout {
            max_width: cfg.display.max_width,
            indent: cfg.display.indent,
        };
        for pattern in &cli.patterns {
            let rows = find_symbols(&gateway, pattern, cli.verbose, cli.path_pattern.as_deref(), layout)?;
            for row in rows {
                println!("{}", row.render(painter.as_ref()));
            }
        }
        return Ok(());
    }

    let seed = Query {
        patterns: cli.patterns.clone(),
        filter: cli.filter.clone(),
        path_prefix: cli.path_prefix.clone(),
    };

    let (matches, patterns) = match seed.patterns.first() {
        Some(first) if cli.definition > 0 => (
            find_declaration_or_definition(&gateway, first, u32::from(cli.definition))?,
            vec![first.clone()],
        ),
        _ => (find_matches(&gateway, &seed)?, seed.patterns.clone()),
    };

    let editor = cfg.editor_command();
    let mut session = Session::new(&gateway, painter.as_ref(), seed).with_clear_screen(cfg.display.clear_screen);
    run_navigator(&mut session, matches, patterns, &editor)
}
