// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command semantics over the debate core.
//!
//! `DebateService` owns the registry, orchestrator, store handle, and the
//! active session, and implements what each command does: dispatch
//! decisions, state mutation, persistence, and the execution gate. The
//! shell (external) parses input and renders the returned text.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use roundtable_backends::Registry;
use roundtable_config::DefaultsConfig;
use roundtable_core::{Backend, MessageKind};
use roundtable_events::{EventSink, MemoryBridge};
use roundtable_storage::DebateStore;

use crate::commands::{Command, HELP_TEXT};
use crate::gate;
use crate::guardian;
use crate::orchestrator::{ModelResponse, Orchestrator};
use crate::session::{DebateSession, RoundKind, RoundOutcome};

/// Implements the semantics of the command surface.
pub struct DebateService {
    registry: Arc<Registry>,
    orchestrator: Orchestrator,
    store: Option<Arc<DebateStore>>,
    events: EventSink,
    memory: MemoryBridge,
    defaults: DefaultsConfig,
    session: Option<DebateSession>,
    cancel: CancellationToken,
}

impl DebateService {
    pub fn new(
        registry: Arc<Registry>,
        store: Option<Arc<DebateStore>>,
        events: EventSink,
        memory: MemoryBridge,
        defaults: DefaultsConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            Duration::from_secs(defaults.model_timeout),
            Duration::from_secs(defaults.consensus_timeout),
        );
        Self {
            registry,
            orchestrator,
            store,
            events,
            memory,
            defaults,
            session: None,
            cancel: CancellationToken::new(),
        }
    }

    /// The active debate session, if any.
    pub fn session(&self) -> Option<&DebateSession> {
        self.session.as_ref()
    }

    /// Starts a new debate and makes it active.
    pub async fn new_debate(&mut self, name: Option<String>) -> String {
        let id = short_id();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("debate-{id}"));

        let session = DebateSession::create(
            id.clone(),
            name.clone(),
            None,
            self.store.clone(),
            self.events.clone(),
            self.memory.clone(),
            self.defaults.auto_debate,
        )
        .await;

        self.events
            .debate_started(&id, &name, self.registry.count());
        info!(debate_id = id.as_str(), name = name.as_str(), "debate started");
        self.session = Some(session);

        format!(
            "Started debate '{name}' with {} model(s). Type a prompt to begin.",
            self.registry.count()
        )
    }

    /// Resumes a stored debate by id.
    pub async fn resume_debate(&mut self, debate_id: &str) -> Result<String, String> {
        let store = self
            .store
            .clone()
            .ok_or_else(|| "no store available".to_string())?;
        let debate = store
            .get_debate(debate_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no debate with id {debate_id}"))?;

        let name = debate.name.clone();
        let session = DebateSession::resume(
            debate,
            store,
            self.events.clone(),
            self.memory.clone(),
            self.defaults.auto_debate,
        )
        .await;
        let count = session.state().messages.len();
        self.session = Some(session);
        Ok(format!("Resumed debate '{name}' ({count} messages)."))
    }

    /// Fans the user's prompt out to every backend and drains the round,
    /// firing the automatic consensus round if configured.
    pub async fn submit_prompt(
        &mut self,
        prompt: &str,
        mut on_response: impl FnMut(&ModelResponse),
    ) -> Result<RoundOutcome, String> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| "No active debate. Use /new to start one.".to_string())?;
        if session.state().paused {
            return Err("Debate is paused. Use /resume to continue.".to_string());
        }

        session.record_user_prompt(prompt).await;

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();

        let history = fan_out_history(session);
        let mut rx = self
            .orchestrator
            .parallel_seed(cancel.clone(), history, prompt.to_string());
        let outcome = session
            .drain(&mut rx, RoundKind::Seed, &mut on_response)
            .await;

        if let RoundOutcome::Scored {
            auto_consensus: true,
            ..
        } = outcome
        {
            let history = fan_out_history(session);
            let mut rx = self.orchestrator.consensus_prompt(cancel, history);
            let outcome = session
                .drain(&mut rx, RoundKind::Consensus, &mut on_response)
                .await;
            return Ok(outcome);
        }

        Ok(outcome)
    }

    /// Dispatches an explicit consensus round.
    pub async fn force_consensus(
        &mut self,
        mut on_response: impl FnMut(&ModelResponse),
    ) -> Result<RoundOutcome, String> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| "No active debate.".to_string())?;

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();

        let history = fan_out_history(session);
        let mut rx = self.orchestrator.consensus_prompt(cancel, history);
        Ok(session
            .drain(&mut rx, RoundKind::Consensus, &mut on_response)
            .await)
    }

    /// Runs `/execute` through the gate; on success dispatches the
    /// execution prompt to the sole executor.
    pub async fn execute(
        &mut self,
        mut on_response: impl FnMut(&ModelResponse),
    ) -> Result<RoundOutcome, String> {
        let request = match gate::check(
            &self.registry,
            self.session.as_ref().map(|s| s.state()),
        ) {
            Ok(request) => request,
            Err(denial) => {
                let text = denial.to_string();
                if let Some(session) = self.session.as_mut() {
                    session.record_system_message(&text).await;
                }
                return Err(text);
            }
        };

        let session = self.session.as_mut().expect("gate checked active debate");
        session
            .record_system_message(&format!(
                "Execution requested. Sending to {} for implementation...",
                request.executor_id
            ))
            .await;

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();

        let history = fan_out_history(session);
        let mut rx = self.orchestrator.send_to(
            cancel,
            &request.executor_id,
            history,
            request.prompt.to_string(),
        );
        let outcome = session
            .drain(&mut rx, RoundKind::Execution, &mut on_response)
            .await;

        // Scan the executor's plan for destructive operations.
        if let Some(plan) = session
            .state()
            .messages
            .iter()
            .rev()
            .find(|m| m.kind == MessageKind::Model && m.source == request.executor_id)
            .map(|m| m.content.clone())
        {
            let patterns = guardian::detect_destructive(&plan);
            if !patterns.is_empty() {
                session
                    .record_system_message(&guardian::format_warning(&patterns))
                    .await;
            }
        }

        Ok(outcome)
    }

    /// Cancels the in-flight round, if any, and stops every backend.
    pub async fn stop_current(&self) {
        self.cancel.cancel();
        self.orchestrator.stop_all().await;
    }

    /// Adds a file or directory summary to the debate context.
    pub async fn add_context(&mut self, path: &str) -> Result<String, String> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| "No active debate.".to_string())?;

        let formatted =
            roundtable_context::load_context(Path::new(path)).map_err(|e| e.to_string())?;

        session
            .state_mut()
            .context_files
            .insert(path.to_string(), formatted.clone());
        if let Some(ref store) = self.store {
            if let Err(e) = store
                .add_context_file(&session.state().id, path, &formatted)
                .await
            {
                tracing::warn!(error = %e, "context file not persisted");
            }
        }
        Ok(format!("Added {path} to debate context."))
    }

    pub async fn remove_context(&mut self, path: &str) -> Result<String, String> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| "No active debate.".to_string())?;

        if session.state_mut().context_files.remove(path).is_none() {
            return Err(format!("{path} is not in the debate context."));
        }
        if let Some(ref store) = self.store {
            if let Err(e) = store.remove_context_file(&session.state().id, path).await {
                tracing::warn!(error = %e, "context file removal not persisted");
            }
        }
        Ok(format!("Removed {path} from debate context."))
    }

    pub fn list_context(&self) -> Result<String, String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| "No active debate.".to_string())?;

        if session.state().context_files.is_empty() {
            return Ok("No context files added.".to_string());
        }
        let mut out = String::from("Context files:\n");
        for path in session.state().context_files.keys() {
            out.push_str(&format!("  {path}\n"));
        }
        Ok(out.trim_end().to_string())
    }

    /// Formats the registry with each backend's current status.
    pub fn model_status(&self) -> String {
        let mut out = String::from("Models:\n");
        for backend in self.registry.all() {
            let info = backend.info();
            let exec = if info.can_exec { " [executor]" } else { "" };
            out.push_str(&format!(
                "  {} ({}){exec}: {}\n",
                info.name,
                info.id,
                backend.status()
            ));
        }
        out.trim_end().to_string()
    }

    /// Lists stored debates, most recently updated first.
    pub async fn show_history(&self) -> Result<String, String> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| "no store available".to_string())?;
        let debates = store.list_debates().await.map_err(|e| e.to_string())?;
        if debates.is_empty() {
            return Ok("No stored debates.".to_string());
        }
        let mut out = String::from("Debates:\n");
        for debate in debates {
            out.push_str(&format!(
                "  {} [{}] {} (updated {})\n",
                debate.id, debate.status, debate.name, debate.updated_at
            ));
        }
        Ok(out.trim_end().to_string())
    }

    /// A plain-text transcript snapshot for external exporters.
    pub fn export_transcript(&self) -> Result<String, String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| "No active debate.".to_string())?;

        let state = session.state();
        let mut out = format!("# {} ({})\n\n", state.name, state.id);
        for message in &state.messages {
            out.push_str(&format!("[{}]: {}\n\n", message.source, message.content));
        }
        Ok(out)
    }

    /// Applies one command, returning the display text.
    pub async fn handle(
        &mut self,
        command: Command,
        on_response: impl FnMut(&ModelResponse),
    ) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::NewDebate { name } => self.new_debate(name).await,
            Command::CloseDebate => match self.session.take() {
                Some(session) => format!("Closed debate '{}'.", session.state().name),
                None => "No active debate.".to_string(),
            },
            Command::RenameDebate { name } => match self.session.as_mut() {
                Some(session) => {
                    session.state_mut().name = name.clone();
                    if let Some(ref store) = self.store {
                        if let Err(e) =
                            store.update_debate_name(&session.state().id, &name).await
                        {
                            tracing::warn!(error = %e, "rename not persisted");
                        }
                    }
                    format!("Renamed debate to '{name}'.")
                }
                None => "No active debate.".to_string(),
            },
            Command::AddContext { path } => self
                .add_context(&path)
                .await
                .unwrap_or_else(|e| e),
            Command::RemoveContext { path } => self
                .remove_context(&path)
                .await
                .unwrap_or_else(|e| e),
            Command::ListContext => self.list_context().unwrap_or_else(|e| e),
            Command::ToggleModels => self.model_status(),
            Command::ForceConsensus => match self.force_consensus(on_response).await {
                Ok(_) => String::new(),
                Err(e) => e,
            },
            Command::Execute => match self.execute(on_response).await {
                Ok(_) => String::new(),
                Err(e) => e,
            },
            Command::Pause => match self.session.as_mut() {
                Some(session) => {
                    session.state_mut().paused = true;
                    let text = "Debate paused. Use /resume to continue.";
                    session.record_system_message(text).await;
                    text.to_string()
                }
                None => "No active debate.".to_string(),
            },
            Command::Resume => match self.session.as_mut() {
                Some(session) => {
                    session.state_mut().paused = false;
                    let text = "Debate resumed.";
                    session.record_system_message(text).await;
                    text.to_string()
                }
                None => "No active debate.".to_string(),
            },
            Command::ShowHistory => self.show_history().await.unwrap_or_else(|e| e),
            Command::Export => self.export_transcript().unwrap_or_else(|e| e),
            Command::ParseError { message } => {
                format!("Command error: {message}\n\n{HELP_TEXT}")
            }
        }
    }
}

/// The transcript handed to backends, with shared context files rendered
/// as a leading system message when present.
fn fan_out_history(session: &DebateSession) -> Vec<roundtable_core::TranscriptMessage> {
    let state = session.state();
    let mut history = Vec::with_capacity(state.messages.len() + 1);

    if !state.context_files.is_empty() {
        let mut combined = String::from("Shared context files:\n\n");
        for content in state.context_files.values() {
            combined.push_str(content);
            combined.push('\n');
        }
        history.push(roundtable_core::TranscriptMessage::system(combined));
    }

    history.extend(state.messages.iter().cloned());
    history
}

/// Short opaque debate identifier.
fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_short_and_unique() {
        let a = short_id();
        let b = short_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
