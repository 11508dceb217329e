//! Command implementations and service wiring.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use console::style;
use serde::Deserialize;

use crate::acquisition::Acquirer;
use crate::config::Config;
use crate::models::AnalysisPrompt;
use crate::pipeline::{PipelineDeps, PipelineService, ProcessOptions, UnlimitedQuota};
use crate::prompts::{PromptStore, SystemClock};
use crate::providers::{
    ChatClient, ScrapeClient, SearchClient, TranscriptClient, TranscriptionClient,
    VideoMetadataClient,
};
use crate::repository::{
    ClaimRepository, ContentRepository, DomainStatsRepository, ModerationRepository,
    PreferenceRepository, PromptRepository, SummaryRepository,
};

/// Wire up repositories, providers, and the pipeline from config.
fn build_service(config: &Config) -> anyhow::Result<PipelineService> {
    fs::create_dir_all(config.data_dir())?;
    let db = config.database_path();

    let prompt_repo = PromptRepository::new(&db)?;
    let prompts = Arc::new(PromptStore::new(
        prompt_repo,
        config.pipeline.prompt_cache_ttl(),
        Arc::new(SystemClock),
    ));
    prompts.seed_defaults()?;

    let transcription = TranscriptionClient::new(config.transcription.clone())?;
    let transcription_callback = transcription.callback_url().map(str::to_string);

    let acquirer = Acquirer {
        video_metadata: Arc::new(VideoMetadataClient::new(config.video.clone())?),
        transcripts: Arc::new(TranscriptClient::new(config.video.clone())?),
        scraper: Arc::new(ScrapeClient::new(config.scrape.clone())?),
        transcription: Arc::new(transcription),
        retry: config.pipeline.retry_policy(),
        call_timeout: config.pipeline.acquisition_timeout(),
    };

    let deps = PipelineDeps {
        content: ContentRepository::new(&db)?,
        summaries: SummaryRepository::new(&db)?,
        claims: ClaimRepository::new(&db)?,
        domains: DomainStatsRepository::new(&db)?,
        moderation: ModerationRepository::new(&db)?,
        preferences: PreferenceRepository::new(&db)?,
        prompts,
        completion: Arc::new(ChatClient::new(config.ai.clone())?),
        search: Arc::new(SearchClient::new(config.search.clone())?),
        acquirer,
        quota: Arc::new(UnlimitedQuota),
        transcription_callback,
        config: config.pipeline.clone(),
    };
    Ok(PipelineService::new(deps))
}

/// Initialize the data directory, database, and built-in prompts.
pub fn cmd_init(config: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(config.data_dir())?;
    let db = config.database_path();

    // Each repository's constructor creates its tables.
    ContentRepository::new(&db)?;
    SummaryRepository::new(&db)?;
    ClaimRepository::new(&db)?;
    DomainStatsRepository::new(&db)?;
    ModerationRepository::new(&db)?;
    PreferenceRepository::new(&db)?;
    let prompt_repo = PromptRepository::new(&db)?;

    let store = PromptStore::new(
        prompt_repo,
        config.pipeline.prompt_cache_ttl(),
        Arc::new(SystemClock),
    );
    let seeded = store.seed_defaults()?;
    if seeded > 0 {
        println!("  {} Seeded {seeded} built-in prompts", style("✓").green());
    }

    println!(
        "{} Initialized veriscope in {}",
        style("✓").green(),
        config.data_dir().display()
    );
    Ok(())
}

/// Analyze a URL and print the outcome.
pub async fn cmd_process(
    config: &Config,
    url: &str,
    user: Option<&str>,
    language: &str,
    force: bool,
    no_fetch: bool,
) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let options = ProcessOptions { force_regenerate: force, skip_acquisition: no_fetch };

    println!("{} Processing {}", style("→").cyan(), url);
    let outcome = service.process_url(url, user, language, options).await?;

    if outcome.cached {
        println!("  {} Served from cache", style("✓").green());
    }
    if outcome.paywall_warning {
        println!("  {} Content may be paywall-truncated", style("!").yellow());
    }
    if let Some(message) = &outcome.failure_message {
        println!("  {} {}", style("✗").red(), message);
    }
    println!(
        "{} {} [{}]: {} sections ({})",
        style("✓").green(),
        outcome.content_id,
        outcome.status.as_str(),
        outcome.sections.len(),
        outcome.sections.join(", ")
    );
    if outcome.tokens.total() > 0 {
        println!(
            "  {} tokens ({} prompt, {} completion)",
            outcome.tokens.total(),
            outcome.tokens.prompt_tokens,
            outcome.tokens.completion_tokens
        );
    }
    Ok(())
}

/// Print a content item's metadata and analysis sections.
pub fn cmd_show(
    config: &Config,
    content_id: &str,
    language: &str,
    section: Option<&str>,
) -> anyhow::Result<()> {
    let db = config.database_path();
    let content = ContentRepository::new(&db)?;
    let summaries = SummaryRepository::new(&db)?;

    let Some(item) = content.get(content_id)? else {
        anyhow::bail!("content {content_id} not found");
    };

    println!("{} {}", style(&item.id).bold(), item.url);
    println!("  type: {}", item.source_type.as_str());
    if let Some(title) = &item.title {
        println!("  title: {title}");
    }
    if let Some(tone) = &item.detected_tone {
        println!("  tone: {tone}");
    }
    if !item.tags.is_empty() {
        println!("  tags: {}", item.tags.join(", "));
    }
    if let Some(category) = item.failure_category() {
        println!("  {} {}", style("✗").red(), category.user_message());
        return Ok(());
    }

    let Some(summary) = summaries.get(content_id, language)? else {
        println!("  no analysis for language {language:?}");
        return Ok(());
    };
    println!("  status: {}", summary.processing_status.as_str());

    for kind in crate::models::SectionKind::ALL {
        if let Some(wanted) = section {
            if kind.as_str() != wanted {
                continue;
            }
        }
        let Some(value) = summary.section(kind) else {
            continue;
        };
        println!("\n{}", style(kind.as_str()).bold().underlined());
        if kind.expects_json() {
            match serde_json::from_str::<serde_json::Value>(value) {
                Ok(parsed) => println!("{}", serde_json::to_string_pretty(&parsed)?),
                Err(_) => println!("{value}"),
            }
        } else {
            println!("{value}");
        }
    }
    Ok(())
}

/// Print the domain credibility table.
pub fn cmd_domains(config: &Config, limit: usize) -> anyhow::Result<()> {
    let domains = DomainStatsRepository::new(&config.database_path())?;
    let stats = domains.list(limit)?;
    if stats.is_empty() {
        println!("No domains analyzed yet");
        return Ok(());
    }

    println!(
        "{:<32} {:>8} {:>8} {:>6}",
        style("domain").bold(),
        style("count").bold(),
        style("avg q").bold(),
        style("warn").bold()
    );
    for s in stats {
        let warn = if s.should_warn() {
            style("yes").red().to_string()
        } else {
            "no".to_string()
        };
        println!(
            "{:<32} {:>8} {:>8.0} {:>6}",
            s.domain,
            s.analysis_count,
            s.average_quality(),
            warn
        );
    }
    Ok(())
}

pub fn cmd_prompts_list(config: &Config) -> anyhow::Result<()> {
    let repo = PromptRepository::new(&config.database_path())?;
    let prompts = repo.list_latest()?;
    if prompts.is_empty() {
        println!("No prompts stored; run `veri init` to seed the defaults");
        return Ok(());
    }
    for p in prompts {
        let model = if p.model.is_empty() { "(default)" } else { p.model.as_str() };
        println!(
            "{:<20} v{:<3} model={} temp={} max_tokens={}",
            style(&p.section).bold(),
            p.version,
            model,
            p.temperature,
            p.max_tokens
        );
    }
    Ok(())
}

pub fn cmd_prompts_show(config: &Config, section: &str) -> anyhow::Result<()> {
    let repo = PromptRepository::new(&config.database_path())?;
    let Some(p) = repo.get_latest(section)? else {
        anyhow::bail!("no prompt stored for section {section:?}");
    };
    println!("{} v{}", style(&p.section).bold(), p.version);
    println!("\n{}\n{}", style("system").underlined(), p.system_text);
    println!("\n{}\n{}", style("template").underlined(), p.user_template);
    Ok(())
}

/// Fields a prompt update file may set; anything absent keeps the current
/// value.
#[derive(Deserialize)]
struct PromptUpdate {
    system_text: Option<String>,
    user_template: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

pub fn cmd_prompts_set(config: &Config, section: &str, file: &Path) -> anyhow::Result<()> {
    let repo = PromptRepository::new(&config.database_path())?;
    let Some(current) = repo.get_latest(section)? else {
        anyhow::bail!("no prompt stored for section {section:?}; run `veri init` first");
    };

    let raw = fs::read_to_string(file)?;
    let update: PromptUpdate = toml::from_str(&raw)?;

    let next = AnalysisPrompt {
        id: 0,
        section: current.section.clone(),
        version: current.version + 1,
        system_text: update.system_text.unwrap_or(current.system_text),
        user_template: update.user_template.unwrap_or(current.user_template),
        model: update.model.unwrap_or(current.model),
        temperature: update.temperature.unwrap_or(current.temperature),
        max_tokens: update.max_tokens.unwrap_or(current.max_tokens),
        expect_json: current.expect_json,
        use_web_search: current.use_web_search,
        updated_at: chrono::Utc::now(),
    };
    repo.insert_version(&next)?;
    println!(
        "{} {} updated to v{}",
        style("✓").green(),
        next.section,
        next.version
    );
    Ok(())
}

/// Start the API server.
pub async fn cmd_serve(config: &Config, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;
    let service = build_service(config)?;

    println!(
        "{} Starting veriscope server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(service, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }
    Ok((bind.to_string(), 3030))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("8080").unwrap(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(
            parse_bind_address("0.0.0.0:9000").unwrap(),
            ("0.0.0.0".to_string(), 9000)
        );
        assert_eq!(parse_bind_address("0.0.0.0").unwrap(), ("0.0.0.0".to_string(), 3030));
    }
}
