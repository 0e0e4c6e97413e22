//! `dispatch` - hook binary for Skill Dispatch
//!
//! # Input (via stdin, `hook` subcommand)
//! JSON with fields: prompt, cwd (other hook fields are ignored)
//!
//! # Output (via stdout)
//! `{}` when nothing matched, otherwise `{"contextRouter": {...}}` with the
//! ranked matches and the confirmation policy for the agent

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use skill_dispatch::cache::{fingerprint, RouteCache};
use skill_dispatch::history::record_match;
use skill_dispatch::output::enforcement_label;
use skill_dispatch::settings::{DispatchPaths, RULES_FILE};
use skill_dispatch::{
    dry_run, format_dry_run, format_output, load_ruleset, route, HookOutput, Result, RouteOptions,
    RuleMatch,
};

#[derive(Parser, Debug)]
#[command(name = "dispatch", version, about = "Context-aware skill router for Claude Code hooks")]
struct Cli {
    /// Rules file (default: <cwd>/.claude/dispatch-rules.json)
    #[arg(short = 'f', long = "file", global = true, env = "DISPATCH_RULES")]
    rules: Option<PathBuf>,

    /// Session history file
    #[arg(long, global = true, env = "DISPATCH_HISTORY")]
    history: Option<PathBuf>,

    /// Route cache file
    #[arg(long, global = true, env = "DISPATCH_CACHE")]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a prompt-submission hook payload from stdin and print the routing result
    Hook,

    /// Dry-run a prompt to see which rules match
    Test {
        prompt: String,

        /// Directory to evaluate context signals in (default: current)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Record that a skill command was invoked in this session
    Record { command: String },
}

/// Input payload from Claude Code UserPromptSubmit hook.
/// `sessionId`, `transcriptPath` and other host fields are accepted and ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HookInput {
    /// The prompt text as typed
    prompt: String,

    /// Working directory of the session; empty means the process cwd
    #[serde(default)]
    cwd: String,
}

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        None | Some(Command::Hook) => run_hook(
            cli.rules.as_deref(),
            cli.history.as_deref(),
            cli.cache.as_deref(),
        ),
        Some(Command::Test { ref prompt, ref cwd }) => {
            run_test(prompt, cwd.clone(), cli.rules.as_deref())
        }
        Some(Command::Record { ref command }) => run_record(command, cli.history.as_deref()),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        if matches!(cli.command, None | Some(Command::Hook)) {
            // Empty response on error so the prompt is never blocked
            println!("{}", serde_json::to_string(&HookOutput::default()).unwrap_or_default());
            std::process::exit(0);
        }
        eprintln!("{}", e.to_string().red());
        std::process::exit(1);
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn run_hook(rules: Option<&Path>, history: Option<&Path>, cache: Option<&Path>) -> Result<()> {
    let mut input_json = String::new();
    io::stdin().read_to_string(&mut input_json)?;
    debug!("Received input: {}", input_json);

    let input: HookInput = serde_json::from_str(&input_json)?;
    let cwd = if input.cwd.is_empty() {
        current_dir()
    } else {
        PathBuf::from(&input.cwd)
    };

    let paths = DispatchPaths::resolve(
        &cwd,
        rules.map(Path::to_path_buf),
        history.map(Path::to_path_buf),
        cache.map(Path::to_path_buf),
    )?;
    if !paths.rules.exists() {
        warn!("Rules not found at {:?}, returning empty", paths.rules);
        println!("{}", serde_json::to_string(&HookOutput::default())?);
        return Ok(());
    }
    let ruleset = load_ruleset(&paths.rules)?;

    info!(
        "Processing prompt: {}",
        input.prompt.chars().take(50).collect::<String>()
    );

    let options = RouteOptions {
        history_path: Some(paths.history.clone()),
    };
    let matches = match ruleset.config.cache_ttl_ms() {
        Some(ttl) => cached_route(&input.prompt, &cwd, &paths.cache, ttl, || {
            route(&input.prompt, &cwd, &ruleset, &options)
        }),
        None => route(&input.prompt, &cwd, &ruleset, &options),
    };

    if matches.is_empty() {
        if ruleset.config.llm_fallback {
            debug!("No rule matched; prompt is eligible for model fallback");
        } else {
            debug!("No matches found");
        }
    }
    log_matches(&matches);

    println!("{}", serde_json::to_string(&format_output(&matches))?);
    Ok(())
}

/// Serve from the route cache when fresh, otherwise compute and store.
/// Cache persistence problems never fail the hook.
fn cached_route<F>(
    prompt: &str,
    cwd: &Path,
    cache_path: &Path,
    ttl_ms: i64,
    compute: F,
) -> Vec<RuleMatch>
where
    F: FnOnce() -> Vec<RuleMatch>,
{
    let now = Utc::now().timestamp_millis();
    let key = fingerprint(prompt, &cwd.to_string_lossy());

    let mut cache = RouteCache::load(cache_path);
    cache.prune(ttl_ms, now);
    if let Some(hit) = cache.get(&key) {
        debug!(key = %key, "Cache hit");
        return hit.clone();
    }

    let matches = compute();
    cache.insert(key, matches.clone(), now);
    if let Err(e) = cache.save(cache_path) {
        warn!("{}", e);
    }
    matches
}

fn log_matches(matches: &[RuleMatch]) {
    for m in matches {
        info!(
            "{} -> {} [{}] score {} (keyword {}, context {})",
            m.name.bold(),
            m.command,
            enforcement_label(m.enforcement),
            m.score,
            m.keyword_score,
            m.context_score
        );
    }
}

fn run_test(prompt: &str, cwd: Option<PathBuf>, rules: Option<&Path>) -> Result<()> {
    let cwd = cwd.unwrap_or_else(current_dir);
    let rules_path = rules
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.join(RULES_FILE));
    let ruleset = load_ruleset(&rules_path)?;

    println!("{}", format_dry_run(&dry_run(prompt, &cwd, &ruleset)));
    Ok(())
}

fn run_record(command: &str, history: Option<&Path>) -> Result<()> {
    let path = match history {
        Some(path) => path.to_path_buf(),
        None => DispatchPaths::resolve(&current_dir(), None, None, None)?.history,
    };
    record_match(command, &path);
    debug!(command = %command, path = %path.display(), "Recorded skill invocation");
    Ok(())
}
