use anyhow::Context;
use chrono::Local;
use clap::{Arg, ArgMatches, Command};
use email_guard::analysis::Layer;
use email_guard::{report, scoring};
use email_guard::{AnalysisResult, ApiClient, Config};
use log::LevelFilter;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("email-guard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Client for the Email Guard phishing-detection service")
        .long_about(
            "Email Guard client - submits raw email text to the analysis service,\n\
             aggregates the five per-layer risk scores into a verdict, and exports\n\
             an auditable HTML or JSON report.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("email-guard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("analyze")
                .short('a')
                .long("analyze")
                .value_name("FILE")
                .help("Submit an email file for analysis and export the report")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("render")
                .long("render")
                .value_name("FILE")
                .help("Re-render a report from a saved analysis result (JSON), offline")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .help("List past analyses stored by the service")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report-index")
                .long("report-index")
                .value_name("N")
                .help("Export the report for history entry N (0 = most recent)")
                .value_parser(clap::value_parser!(usize))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Report format: html or json")
                .default_value("html"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Report output path (defaults to the configured output directory)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .value_name("USER")
                .help("Service account username")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASS")
                .help("Service account password")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .value_name("TOKEN")
                .help("Bearer token (skips the login request)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("register")
                .long("register")
                .help("Register a new account instead of logging in")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if let Some(json_file) = matches.get_one::<String>("render") {
        if let Err(e) = render_saved_result(&config, &matches, json_file) {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
        return;
    }

    let email_file = matches.get_one::<String>("analyze");
    let wants_history = matches.get_flag("history") || matches.contains_id("report-index");
    if email_file.is_none() && !wants_history {
        eprintln!("Nothing to do: pass --analyze, --history, --report-index, or --render");
        process::exit(1);
    }

    let client = match ApiClient::new(&config.api_base_url, config.request_timeout_seconds) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {e}");
            process::exit(1);
        }
    };

    let token = match resolve_token(&client, &matches).await {
        Ok(token) => token,
        Err(e) => {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    };

    if let Some(email_file) = email_file {
        if let Err(e) = analyze_email_file(&config, &client, &token, email_file, &matches).await {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }

    if wants_history {
        if let Err(e) = show_history(&config, &client, &token, &matches).await {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

async fn resolve_token(client: &ApiClient, matches: &ArgMatches) -> anyhow::Result<String> {
    if let Some(token) = matches.get_one::<String>("token") {
        return Ok(token.clone());
    }

    let username = matches
        .get_one::<String>("username")
        .context("authentication required: pass --token or --username/--password")?;
    let password = matches
        .get_one::<String>("password")
        .context("authentication required: pass --token or --username/--password")?;

    let token = if matches.get_flag("register") {
        log::info!("Registering account '{username}'");
        client.register(username, password).await?
    } else {
        client.login(username, password).await?
    };
    Ok(token)
}

async fn analyze_email_file(
    config: &Config,
    client: &ApiClient,
    token: &str,
    email_file: &str,
    matches: &ArgMatches,
) -> anyhow::Result<()> {
    println!("🔍 Analyzing email file: {email_file}");
    let raw = std::fs::read_to_string(email_file)
        .with_context(|| format!("failed to read email file '{email_file}'"))?;

    let result = client.analyze(token, &raw).await?;
    check_verdict_parity(&result);
    print_summary(&result);
    export_report(config, &result, matches)
}

async fn show_history(
    config: &Config,
    client: &ApiClient,
    token: &str,
    matches: &ArgMatches,
) -> anyhow::Result<()> {
    let history = client.history(token).await?;

    if let Some(&index) = matches.get_one::<usize>("report-index") {
        let result = history.get(index).with_context(|| {
            format!("history has {} entries, no entry {index}", history.len())
        })?;
        print_summary(result);
        return export_report(config, result, matches);
    }

    if history.is_empty() {
        println!("No past analyses found");
        return Ok(());
    }

    println!("📊 Past analyses ({} total):", history.len());
    for (index, entry) in history.iter().enumerate() {
        let safety = scoring::safety_score(entry.final_score);
        let analyzed = entry
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        println!(
            "  [{index}] {analyzed}  {}  safety {safety:.1}/100",
            entry.classification
        );
    }
    Ok(())
}

fn render_saved_result(
    config: &Config,
    matches: &ArgMatches,
    json_file: &str,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(json_file)
        .with_context(|| format!("failed to read result file '{json_file}'"))?;
    let result: AnalysisResult = serde_json::from_str(&content)
        .with_context(|| format!("'{json_file}' is not a valid analysis result"))?;

    check_verdict_parity(&result);
    print_summary(&result);
    export_report(config, &result, matches)
}

/// Re-derives the verdict locally and warns when the service's stored values
/// disagree with the fixed weight table.
fn check_verdict_parity(result: &AnalysisResult) {
    match scoring::classify(&result.layer_scores()) {
        Ok(verdict) => {
            if (verdict.final_score - result.final_score).abs() > 1e-6
                || verdict.classification != result.classification
            {
                log::warn!(
                    "service verdict ({} at {:.3}) disagrees with local aggregation ({} at {:.3})",
                    result.classification,
                    result.final_score,
                    verdict.classification,
                    verdict.final_score
                );
            }
        }
        Err(e) => log::warn!("could not re-derive verdict: {e}"),
    }
}

fn print_summary(result: &AnalysisResult) {
    let safety = scoring::safety_score(result.final_score);
    println!();
    println!(
        "{} Classification: {}  (safety {safety:.1}/100)",
        report::badge_label(result.classification),
        result.classification
    );

    for layer in Layer::ALL {
        let layer_safety = scoring::safety_score(result.layer_score(layer));
        let reasons = result
            .explanations
            .get(&layer)
            .map(|e| {
                if e.reasons.is_empty() {
                    "No specific flags".to_string()
                } else {
                    e.reasons.join("; ")
                }
            })
            .unwrap_or_else(|| "No specific flags".to_string());
        println!(
            "  {:<16} {layer_safety:>5.1}/100 ({:.0}%)  {reasons}",
            layer.label(),
            scoring::weight(layer) * 100.0
        );
    }

    let actions = scoring::recommended_actions(result.classification);
    println!("  Recommended actions: {}", actions.actions.join(", "));
    println!();
}

fn export_report(
    config: &Config,
    result: &AnalysisResult,
    matches: &ArgMatches,
) -> anyhow::Result<()> {
    let format = matches.get_one::<String>("format").unwrap();
    let output = matches.get_one::<String>("output");
    let now = Local::now();

    match format.as_str() {
        "json" => {
            let json = report::render_json(result).context("failed to serialize result")?;
            match output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("failed to write report to '{path}'"))?;
                    println!("📄 Report written to: {path}");
                }
                None => println!("{json}"),
            }
        }
        "html" => {
            let html = report::render_report(result, now)?;
            let path = match output {
                Some(path) => path.clone(),
                None => Path::new(&config.report_output_dir)
                    .join(report::report_filename(now.date_naive()))
                    .to_string_lossy()
                    .into_owned(),
            };
            std::fs::write(&path, html)
                .with_context(|| format!("failed to write report to '{path}'"))?;
            println!("📄 Report written to: {path}");
        }
        other => anyhow::bail!("unsupported report format '{other}' (expected html or json)"),
    }
    Ok(())
}
