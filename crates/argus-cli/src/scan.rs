//! `scan` and `config` subcommands.

use crate::cli::{ConfigArgs, ScanArgs};
use crate::output::{self, OutputFormat};
use crate::progress::ProgressObserver;
use anyhow::{bail, Context, Result};
use argus_core::{expand_usernames, lists, AppConfig, DataFiles};
use argus_llm::{GeminiProvider, GovernorSettings, OracleSettings, RateGovernor, VerdictOracle};
use argus_scanner::{
    DeepScanConfig, ExistenceVerifier, FetchSettings, FetcherFactory, FingerprintSet,
    HttpFetcherFactory, HttpProxyValidator, ProxyPool, RedirectDenylist, ResultStore,
    ScanObserver, ScanOrchestrator, ScanSession, UserAgentPool, TOR_PROXY,
};
use indicatif::MultiProgress;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Run a scan end to end: load inputs, scan, print and write results.
pub async fn run_scan(
    args: ScanArgs,
    config: &AppConfig,
    files: &DataFiles,
    bars: MultiProgress,
) -> Result<()> {
    let usernames = collect_usernames(&args)?;
    let sources = lists::load_sources(&files.sources()).context("a sources list is required")?;
    if sources.is_empty() {
        bail!("{} contains no sources", files.sources().display());
    }

    let fingerprints = FingerprintSet::with_defaults(lists::load_optional_list(
        &files.fingerprints(),
        "fingerprints",
    )?);
    let denylist = RedirectDenylist::new(lists::load_optional_list(
        &files.bad_redirects(),
        "redirect denylist",
    )?);
    let user_agents = UserAgentPool::new(lists::load_optional_list(
        &files.user_agents(),
        "user agents",
    )?);

    let oracle = build_oracle(args.ai || config.llm.enabled, config)?;
    let mut verifier = ExistenceVerifier::new(fingerprints, Arc::new(oracle));
    if let Some(prompt) = load_prompt(&files.verdict_prompt())? {
        verifier = verifier.with_prompt_template(prompt);
    }

    let proxies = resolve_proxies(&args, config).await?;
    let fetchers: Arc<dyn FetcherFactory> = Arc::new(HttpFetcherFactory::new(
        FetchSettings {
            timeout: Duration::from_secs(config.scan.timeout_secs),
            max_redirects: config.scan.max_redirects,
        },
        denylist,
        user_agents,
        proxies,
    ));

    let store = Arc::new(ResultStore::new());
    let observer: Arc<dyn ScanObserver> = Arc::new(ProgressObserver::new(bars));
    let mut session = ScanSession::new(sources, Arc::new(verifier), fetchers, Arc::clone(&store))
        .with_concurrency(
            args.threads.unwrap_or(config.scan.threads),
            config.scan.ai_threads,
        )
        .with_observer(observer);
    if let Some(deep_scan) = load_deep_scan(args.deep_scan, config.scan.deep_scan, files)? {
        session = session.with_deep_scan(Arc::new(deep_scan));
    }

    info!(
        usernames = usernames.len(),
        sources = session.source_count(),
        "starting scan"
    );
    let report = ScanOrchestrator::new(session).run(&usernames).await;
    info!(
        jobs = report.jobs_completed(),
        findings = report.findings(),
        "scan complete"
    );

    print_summary(&usernames, &store);

    let formats = requested_formats(&args);
    if !formats.is_empty() {
        let dir = args
            .output
            .as_deref()
            .unwrap_or(config.output.directory.as_path());
        let written =
            output::write_results(dir, &usernames, &store, &formats, chrono::Local::now())?;
        for path in written {
            info!("Results written to {}", path.display());
        }
    }

    Ok(())
}

/// Store (or clear) the Gemini API key.
pub fn run_config(args: ConfigArgs, mut config: AppConfig, files: &DataFiles) -> Result<()> {
    let key = match args.gemini_key {
        Some(key) => key,
        None => prompt_line("Enter your Google Gemini API key (blank to remove): ")?,
    };
    let key = key.trim();
    config.llm.api_key = (!key.is_empty()).then(|| key.to_string());
    config.save_to(&files.config())?;

    if config.llm.api_key.is_some() {
        println!("Gemini API key saved to {}", files.config().display());
    } else {
        println!("Gemini API key removed from {}", files.config().display());
    }
    Ok(())
}

fn collect_usernames(args: &ScanArgs) -> Result<Vec<String>> {
    let mut raw = Vec::new();
    if let Some(path) = &args.username_list {
        raw.extend(lists::load_list(path, "usernames")?);
    }
    raw.extend(
        args.usernames
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
    );

    let usernames = expand_usernames(raw);
    if usernames.is_empty() {
        bail!("no usernames given; pass them as arguments or with --username-list");
    }
    Ok(usernames)
}

fn build_oracle(wanted: bool, config: &AppConfig) -> Result<VerdictOracle> {
    let llm = &config.llm;
    let settings = OracleSettings {
        quota_cooldown: Duration::from_secs(llm.quota_cooldown_secs),
        max_quota_retries: llm.max_quota_retries,
        fail_open: llm.fail_open,
    };
    if !wanted {
        return Ok(VerdictOracle::disabled(settings));
    }

    let Some(api_key) = llm.api_key.as_deref() else {
        bail!(
            "You must configure Argus with a Google Gemini API key in order to use --ai. \
             Run 'argus config'"
        );
    };
    let provider = GeminiProvider::with_model(api_key, llm.model.clone())?;
    let governor = RateGovernor::new(GovernorSettings {
        limit: llm.token_limit,
        high_water_mark: llm.high_water_mark,
        window: Duration::from_secs(llm.window_secs),
        safety_buffer: Duration::from_secs(llm.safety_buffer_secs),
    });

    info!("Running with Google Gemini capabilities");
    Ok(VerdictOracle::new(Arc::new(provider), Arc::new(governor), settings))
}

fn load_prompt(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        tracing::debug!("using built-in verdict prompt");
        return Ok(None);
    }
    let prompt = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((!prompt.trim().is_empty()).then_some(prompt))
}

fn load_deep_scan(
    requested: bool,
    configured: bool,
    files: &DataFiles,
) -> Result<Option<DeepScanConfig>> {
    let path = files.deep_scan();
    if !path.exists() {
        if requested {
            warn!("Deep scan needs {}; continuing without it", path.display());
        }
        return Ok(None);
    }
    if !(requested || configured) {
        return Ok(None);
    }

    let config = DeepScanConfig::load(&path)?;
    info!(domains = config.len(), "deep scan enabled");
    Ok(Some(config))
}

async fn resolve_proxies(args: &ScanArgs, config: &AppConfig) -> Result<ProxyPool> {
    let proxies = if let Some(proxy) = &args.proxy {
        vec![proxy.clone()]
    } else if args.tor {
        vec![TOR_PROXY.to_string()]
    } else if let Some(path) = &args.proxy_list {
        lists::load_list(path, "proxies")?
    } else {
        Vec::new()
    };

    let validator = HttpProxyValidator::new(
        config.proxy.echo_url.clone(),
        Duration::from_secs(config.proxy.validation_timeout_secs),
    );
    let pool = ProxyPool::resolve(proxies, &validator, config.proxy.validation_limit).await?;
    if pool.rotates() {
        info!("rotating proxies per request");
    }
    Ok(pool)
}

fn requested_formats(args: &ScanArgs) -> Vec<OutputFormat> {
    let mut formats = Vec::new();
    if args.json {
        formats.push(OutputFormat::Json);
    }
    if args.text {
        formats.push(OutputFormat::Text);
    }
    formats
}

fn print_summary(usernames: &[String], store: &ResultStore) {
    for username in usernames {
        println!("All sites for {username}:");
        for (domain, url) in store.findings(username) {
            println!("[+] {domain:<14} => {url:<45}");
        }
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
