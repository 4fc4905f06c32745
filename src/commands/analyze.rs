//! `analyze` command: parse, score, optionally narrate, then report.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::analysis::analyze_basic_with;
use crate::commands::inspect::{parse_export, read_export};
use crate::config::Config;
use crate::history::{HistoryEntry, HistoryStore, JsonFileHistory, MemoryHistory};
use crate::metrics;
use crate::narrative::{NarrativeAnalyzer, NarrativeModel, NarrativeRequest, OpenAINarrator};
use crate::report::{write_outputs, AnalysisBody, AnalysisReport, OutputFormat};
use crate::situation::SituationType;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Participant whose perspective is "me".
    pub self_name: String,
    /// Run the narrative step for this situation.
    pub situation: Option<SituationType>,
    pub output_format: OutputFormat,
    /// Overrides `config.output_dir`.
    pub output_dir: Option<PathBuf>,
    /// Skip writing report files.
    pub no_report: bool,
    pub save_history: bool,
    /// Overrides `config.analysis.window_days`.
    pub window_days: Option<i64>,
    pub settings: Config,
}

impl AnalyzeConfig {
    pub fn new(self_name: impl Into<String>, settings: Config) -> Self {
        Self {
            self_name: self_name.into(),
            situation: None,
            output_format: OutputFormat::default(),
            output_dir: None,
            no_report: false,
            save_history: true,
            window_days: None,
            settings,
        }
    }

    fn window_days(&self) -> i64 {
        self.window_days.unwrap_or(self.settings.analysis.window_days)
    }

    fn output_dir(&self) -> &Path {
        self.output_dir
            .as_deref()
            .unwrap_or(&self.settings.output_dir)
    }
}

/// Run with the OpenAI narrator and the on-disk history.
pub async fn run(path: &Path, config: AnalyzeConfig) -> Result<AnalysisReport> {
    let narrator = match config.situation {
        Some(_) => Some(
            NarrativeAnalyzer::new(OpenAINarrator::from_settings(&config.settings.openai)?)
                .with_prompts_dir(config.settings.prompts_dir.clone()),
        ),
        None => None,
    };

    if config.save_history {
        let store = JsonFileHistory::new(
            config.settings.history.path.clone(),
            config.settings.history.max_entries,
        );
        run_with(path, &config, narrator.as_ref(), &store).await
    } else {
        run_with(path, &config, narrator.as_ref(), &MemoryHistory::default()).await
    }
}

pub async fn run_with<M: NarrativeModel>(
    path: &Path,
    config: &AnalyzeConfig,
    narrator: Option<&NarrativeAnalyzer<M>>,
    history: &dyn HistoryStore,
) -> Result<AnalysisReport> {
    let content = read_export(path)?;
    let window_days = config.window_days();
    let options = config.settings.parse_options_with_window(Some(window_days))?;

    let conversation = parse_export(&content, Some(&config.self_name), &options)?;
    metrics::record_parsed_messages(conversation.platform, conversation.messages.len());
    info!(
        file = %path.display(),
        platform = %conversation.platform,
        messages = conversation.messages.len(),
        participants = conversation.participants.len(),
        "Parsed export"
    );

    if conversation.is_empty() {
        warn!(window_days, "No messages in the analysis window");
        return Err(Error::EmptyConversation);
    }
    if !conversation.has_participant(&config.self_name) {
        return Err(Error::UnknownParticipant(format!(
            "{} (available: {})",
            config.self_name,
            conversation.participants.join(", ")
        )));
    }

    let basic = analyze_basic_with(
        &conversation,
        &config.self_name,
        &config.settings.analysis_params(),
    );
    metrics::observe_temperature(basic.temperature);
    info!(
        temperature = basic.temperature,
        label = %basic.temperature_label,
        "Basic analysis complete"
    );

    let body = match (config.situation, narrator) {
        (Some(situation), Some(narrator)) => {
            let request = NarrativeRequest::from_conversation(
                &conversation,
                basic.clone(),
                &config.self_name,
                situation,
                config.settings.openai.recent_messages,
            );
            AnalysisBody::Detailed(narrator.analyze(&request).await?)
        }
        (Some(situation), None) => {
            warn!(%situation, "No narrative model configured, reporting metrics only");
            AnalysisBody::Basic(basic.clone())
        }
        (None, _) => AnalysisBody::Basic(basic.clone()),
    };

    let analyzed_at = Utc::now();
    history.save(HistoryEntry::from_analysis(
        &basic,
        conversation.platform,
        config.situation,
        analyzed_at,
    ))?;
    let change = history.temperature_change()?;

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let report = AnalysisReport::new(source, &conversation, &config.self_name, body, analyzed_at)
        .with_temperature_change(change);

    if !config.no_report {
        write_outputs(&report, config.output_dir(), config.output_format)?;
    }

    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &AnalysisReport) {
    let basic = report.analysis.basic();
    println!(
        "🌡️  {}°C  {}",
        basic.temperature, basic.temperature_label
    );
    if let Some(change) = report.temperature_change {
        println!("   지난 분석 대비 {:+}°C", change);
    }
    println!(
        "   메시지 {} (나 {} / 상대 {}), 응답 {}분 / {}분",
        basic.message_count.total,
        basic.message_count.me,
        basic.message_count.other,
        basic.response_speed.me,
        basic.response_speed.other
    );
    if let Some(narrative) = report.analysis.narrative() {
        let situation = narrative.situation_type();
        println!("{} {}: {}", situation.emoji(), situation.label(), narrative.summary());
    }
}
