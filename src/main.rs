use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tribunal_core::TribunalConfig;
use tribunal_review::github::GitHubSource;
use tribunal_review::judges::{self, Preset};
use tribunal_review::llm::OpenAiClient;
use tribunal_review::ratelimit::RateLimiter;
use tribunal_review::service::{ReviewOptions, ReviewService};
use tribunal_server::AppContext;

#[derive(Parser)]
#[command(
    name = "tribunal",
    version,
    about = "Multi-judge AI code review for GitHub URLs",
    long_about = "Tribunal reviews a GitHub pull request, repository, commit, or branch\n\
                   with a panel of specialized AI judges and merges their verdicts into\n\
                   one weighted score.\n\n\
                   Examples:\n  \
                     tribunal serve                                   Start the review API\n  \
                     tribunal review https://github.com/owner/repo/pull/42\n  \
                     tribunal review <url> --preset quick             Three fast judges\n  \
                     tribunal review <url> --judges security,testing  Hand-picked panel\n  \
                     tribunal judges                                  List judges and presets\n  \
                     tribunal init                                    Create .tribunal.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .tribunal.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP review API
    #[command(long_about = "Start the HTTP review API.\n\n\
        Serves POST /review (run a review) and GET /review (judge catalog)\n\
        with per-client rate limiting and a commit-pinned review cache.\n\n\
        Examples:\n  tribunal serve\n  tribunal serve --port 9000\n  RUST_LOG=debug tribunal serve")]
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Review a GitHub URL from the command line
    #[command(long_about = "Review a GitHub URL from the command line.\n\n\
        Accepts pull request, repository, commit, and branch URLs. Requires\n\
        OPENAI_API_KEY (or api_key in .tribunal.toml); GITHUB_TOKEN raises\n\
        the GitHub API rate limit and enables private repositories.\n\n\
        Examples:\n  tribunal review https://github.com/vercel/next.js/pull/71742\n  \
        tribunal review https://github.com/tokio-rs/tokio --preset comprehensive\n  \
        tribunal review <url> --judges correctness,security --model gpt-4o-mini")]
    Review {
        /// The GitHub URL to review
        url: String,

        /// Comma-separated judge ids (overrides --preset)
        #[arg(long, value_delimiter = ',')]
        judges: Vec<String>,

        /// Judge preset: quick, standard, or comprehensive
        #[arg(long)]
        preset: Option<Preset>,

        /// Model to use (must be in the catalog)
        #[arg(long)]
        model: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// List the judge panel, presets, and models
    Judges {
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Create a default .tribunal.toml configuration file
    #[command(long_about = "Create a default .tribunal.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .tribunal.toml already exists.")]
    Init,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Machine-readable JSON with camelCase keys
    Json,
    /// GitHub-flavored Markdown
    Markdown,
}

const DEFAULT_CONFIG: &str = r#"# Tribunal Configuration
# See: https://github.com/tribunal-dev/tribunal

[llm]
# provider = "openai"
# model = "gpt-4o"
# api_key = "sk-..."          # or set OPENAI_API_KEY
# base_url = "http://localhost:4000"   # any OpenAI-compatible endpoint

[github]
# token = "ghp_..."           # or set GITHUB_TOKEN

[server]
# bind = "127.0.0.1"
# port = 8787

[cache]
# ttl_secs = 86400            # 24 hours

[rate_limit]
# window_secs = 60
# max_requests = 10

[review]
# max_diff_bytes = 60000
"#;

fn load_config(path: &Option<PathBuf>) -> Result<TribunalConfig> {
    let mut config = match path {
        Some(path) => TribunalConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = std::path::Path::new(".tribunal.toml");
            if default_path.exists() {
                TribunalConfig::from_file(default_path).into_diagnostic()?
            } else {
                TribunalConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn build_service(config: &TribunalConfig) -> Result<ReviewService> {
    let source = GitHubSource::new(config.github.token.clone()).into_diagnostic()?;
    let llm = OpenAiClient::new(&config.llm).into_diagnostic()?;
    Ok(ReviewService::new(Arc::new(source), Arc::new(llm), config))
}

fn grade_symbol(grade: &tribunal_core::Grade) -> &'static str {
    use tribunal_core::Grade;
    match grade {
        Grade::APlus | Grade::A | Grade::BPlus | Grade::B => "\u{2713}",
        Grade::CPlus | Grade::C | Grade::D => "~",
        Grade::F => "\u{2717}",
    }
}

fn print_text_review(result: &tribunal_core::ReviewResult) {
    println!(
        "{} Overall: {}/100 ({}) — {}",
        grade_symbol(&result.overall.grade),
        result.overall.score,
        result.overall.grade,
        result.overall.verdict,
    );
    println!("\n{}\n", result.overall.summary);

    for judge in &result.judges {
        println!(
            "{} {} — {}/100: {}",
            judge.icon, judge.name, judge.score, judge.verdict
        );
        for finding in &judge.findings {
            println!(
                "    [{}] {}: {}",
                finding.severity, finding.title, finding.message
            );
            if let Some(suggestion) = &finding.suggestion {
                println!("      suggestion: {suggestion}");
            }
        }
    }

    println!(
        "\nReviewed with {} judges using {}",
        result.metadata.judges_used.len(),
        result.metadata.model_used,
    );
}

fn print_markdown_review(result: &tribunal_core::ReviewResult) {
    println!(
        "# Tribunal Review — {}/100 ({})\n",
        result.overall.score, result.overall.grade
    );
    println!("**Verdict:** {}\n", result.overall.verdict);
    println!("{}\n", result.overall.summary);

    println!("| Judge | Score | Verdict |");
    println!("|-------|-------|---------|");
    for judge in &result.judges {
        println!(
            "| {} {} | {}/100 | {} |",
            judge.icon, judge.name, judge.score, judge.verdict
        );
    }
    println!();

    for judge in &result.judges {
        if judge.findings.is_empty() {
            continue;
        }
        println!("## {} {}\n", judge.icon, judge.name);
        for finding in &judge.findings {
            println!(
                "- **[{}] {}** — {}",
                finding.severity, finding.title, finding.message
            );
            if let Some(location) = &finding.location {
                println!("  - at `{location}`");
            }
            if let Some(suggestion) = &finding.suggestion {
                println!("  - suggestion: {suggestion}");
            }
        }
        println!();
    }

    if let Some(report) = &result.full_report {
        println!("{report}");
    }
}

async fn run_review(
    config: &TribunalConfig,
    url: String,
    judge_ids: Vec<String>,
    preset: Option<Preset>,
    model: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if config.llm.api_key.is_none() && config.llm.base_url.is_none() {
        miette::bail!(miette::miette!(
            help = "Set OPENAI_API_KEY, or add api_key under [llm] in .tribunal.toml",
            "No API key configured for LLM provider '{}'",
            config.llm.provider
        ));
    }

    let service = build_service(config)?;
    let opts = ReviewOptions {
        url,
        judges: if judge_ids.is_empty() {
            None
        } else {
            Some(judge_ids)
        },
        preset,
        model,
    };

    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .expect("spinner template"),
        );
        pb.set_message("Convening the tribunal...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let outcome = service.review(&opts).await;
    if let Some(pb) = spinner {
        match &outcome {
            Ok(_) => pb.finish_and_clear(),
            Err(_) => pb.finish_with_message("Failed"),
        }
    }
    let (result, cache) = outcome.into_diagnostic()?;

    if cache.hit {
        eprintln!("(served from cache, commit {})", cache.commit_hash);
    }

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print_markdown_review(&result),
        OutputFormat::Text => print_text_review(&result),
    }
    Ok(())
}

fn run_judges(config: &TribunalConfig, format: OutputFormat) -> Result<()> {
    let catalog = judges::catalog(&config.llm.model);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&catalog).into_diagnostic()?
            );
        }
        _ => {
            println!("Judges:");
            for judge in &catalog.judges {
                println!(
                    "  {} {:<16} ({}, weight {:.1})",
                    judge.icon, judge.name, judge.id, judge.weight
                );
                println!("      focuses on {}", judge.focus);
            }
            println!("\nPresets:");
            for preset in &catalog.presets {
                println!("  {:<14} {}", preset.id, preset.judges.join(", "));
            }
            println!("\nModels:");
            for model in &catalog.models {
                let marker = if *model == catalog.default_model {
                    " (default)"
                } else {
                    ""
                };
                println!("  {model}{marker}");
            }
        }
    }
    Ok(())
}

async fn run_serve(config: TribunalConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tribunal=info,tower_http=info".into()),
        )
        .init();

    if config.llm.api_key.is_none() && config.llm.base_url.is_none() {
        tracing::warn!("no LLM API key configured; review requests will fail");
    }

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .into_diagnostic()
        .wrap_err(format!("invalid bind address {bind}:{port}"))?;

    let ctx = Arc::new(AppContext {
        service: build_service(&config)?,
        limiter: RateLimiter::new(&config.rate_limit),
    });
    tribunal_server::serve(ctx, addr).await.into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Serve { bind, port } => run_serve(config, bind, port).await?,
        Command::Review {
            url,
            judges,
            preset,
            model,
            format,
        } => run_review(&config, url, judges, preset, model, format).await?,
        Command::Judges { format } => run_judges(&config, format)?,
        Command::Init => {
            let path = std::path::Path::new(".tribunal.toml");
            if path.exists() {
                miette::bail!(".tribunal.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .tribunal.toml with default configuration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_core::Grade;

    #[test]
    fn every_grade_maps_to_a_symbol() {
        for score in 0..=100u8 {
            let symbol = grade_symbol(&Grade::from_score(score));
            assert!(["\u{2713}", "~", "\u{2717}"].contains(&symbol), "score {score}");
        }
        assert_eq!(grade_symbol(&Grade::BPlus), "\u{2713}");
        assert_eq!(grade_symbol(&Grade::CPlus), "~");
    }

    #[test]
    fn default_config_template_parses() {
        let config = TribunalConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, 8787);
    }
}
