// ABOUTME: Timeline builder folding tool, thinking, planning, and activity events
// ABOUTME: Plus the terminal transitions applied when a turn ends, fails, or is stopped

use chrono::Utc;
use tracing::debug;
use weft_proto::{ActivityKind, Event, ToolOutcome};

use crate::types::{Action, ActionKind, PlanBlock, Status, ThinkingBlock, Timeline, TurnResult};

impl Timeline {
    /// Fold one activity event into the timeline.
    ///
    /// Stream lifecycle, metadata, and legacy events are not timeline events
    /// and are ignored here. Updates with no matching active action are no-ops.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::ToolStart {
                tool_id,
                tool_name,
                detail,
            } => {
                self.complete_active_plan();
                let mut action = Action::new(ActionKind::Tool, tool_name.clone());
                if let Some(id) = tool_id {
                    action.id = id.clone();
                }
                action.tool_name = Some(tool_name.clone());
                action.detail = detail.clone();
                self.actions.push(action);
            }
            Event::ToolEnd {
                tool_id,
                tool_name,
                outcome,
                result,
                duration_ms,
            } => {
                let Some(action) = self.find_active_mut(tool_id.as_deref(), tool_name.as_deref())
                else {
                    debug!(?tool_id, ?tool_name, "tool-end without an active action");
                    return;
                };
                action.status = match outcome {
                    ToolOutcome::Completed => Status::Completed,
                    ToolOutcome::Failed => Status::Failed,
                };
                if result.is_some() {
                    action.result = result.clone();
                }
                if duration_ms.is_some() {
                    action.duration_ms = *duration_ms;
                }
                action.progress = Some(100);
            }
            Event::ToolProgress {
                tool_id,
                tool_name,
                detail,
                progress,
            } => {
                let Some(action) = self.find_active_mut(tool_id.as_deref(), tool_name.as_deref())
                else {
                    debug!(?tool_id, ?tool_name, "tool-progress without an active action");
                    return;
                };
                if detail.is_some() {
                    action.detail = detail.clone();
                }
                if let Some(progress) = progress.and_then(clamp_progress) {
                    action.progress = Some(progress);
                }
            }
            Event::Planning { content } => {
                self.plan = Some(PlanBlock {
                    raw: content.clone(),
                    steps: parse_steps(content),
                    status: Status::Active,
                    timestamp: Utc::now(),
                });
            }
            Event::Summarizing => {
                self.summarizing = true;
                self.complete_active_plan();
            }
            Event::ThinkingStart { content } => {
                self.thinking = Some(ThinkingBlock {
                    content: content.clone().unwrap_or_default(),
                    status: Status::Active,
                    timestamp: Utc::now(),
                });
            }
            Event::ThinkingUpdate { content } => match &mut self.thinking {
                Some(thinking) => thinking.content = content.clone(),
                None => {
                    self.thinking = Some(ThinkingBlock {
                        content: content.clone(),
                        status: Status::Active,
                        timestamp: Utc::now(),
                    })
                }
            },
            Event::ThinkingEnd { content } => match &mut self.thinking {
                Some(thinking) => {
                    if let Some(content) = content {
                        thinking.content = content.clone();
                    }
                    if thinking.status.is_active() {
                        thinking.status = Status::Completed;
                    }
                }
                None => {
                    if let Some(content) = content {
                        self.thinking = Some(ThinkingBlock {
                            content: content.clone(),
                            status: Status::Completed,
                            timestamp: Utc::now(),
                        });
                    }
                }
            },
            Event::Activity {
                kind,
                label,
                detail,
            } => self.push_activity(*kind, label.as_deref(), detail.as_deref()),
            Event::TerminalOutput { output } => {
                match self
                    .actions
                    .iter_mut()
                    .rev()
                    .find(|a| a.status.is_active() && a.runs_command())
                {
                    Some(action) => action
                        .terminal_output
                        .get_or_insert_with(String::new)
                        .push_str(output),
                    None => debug!("terminal output without an active command"),
                }
            }
            Event::StreamStart { .. }
            | Event::StreamChunk { .. }
            | Event::StreamEnd { .. }
            | Event::StreamError { .. }
            | Event::Metadata(_)
            | Event::BotResponse { .. } => {}
        }
    }

    /// Settle a successfully finished turn.
    ///
    /// Narrated actions have no end event of their own and complete with the
    /// turn. A tool call that never reported tool-end is marked failed.
    pub fn settle(&mut self) {
        self.complete_active_plan();
        if let Some(thinking) = self.thinking.as_mut().filter(|t| t.status.is_active()) {
            thinking.status = Status::Completed;
        }
        self.summarizing = false;
        for action in self.actions.iter_mut().filter(|a| a.status.is_active()) {
            action.status = match action.kind {
                ActionKind::Tool => Status::Failed,
                _ => Status::Completed,
            };
        }
    }

    /// Mark everything still running as failed after a stream error
    pub fn fail_active(&mut self) {
        if let Some(thinking) = self.thinking.as_mut().filter(|t| t.status.is_active()) {
            thinking.status = Status::Failed;
        }
        self.set_active_actions(Status::Failed);
    }

    /// Freeze the timeline after a user stop
    pub fn stop(&mut self, summary: &str) {
        self.fail_active();
        self.complete_active_plan();
        self.summarizing = false;
        self.result = Some(TurnResult {
            summary: summary.to_string(),
        });
    }

    /// Actions still in `active` state
    pub fn active_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.status.is_active())
    }

    fn push_activity(&mut self, kind: ActivityKind, label: Option<&str>, detail: Option<&str>) {
        let kind = ActionKind::from(kind);
        if kind == ActionKind::Working {
            if let Some(last) = self.actions.last() {
                if last.kind == kind && last.detail.as_deref() == detail {
                    return;
                }
            }
        }

        let label = label.unwrap_or_else(|| default_label(kind));
        let mut action = Action::new(kind, label.to_string());
        action.detail = detail.map(str::to_string);
        self.actions.push(action);
    }

    /// First active action matching the id, else the first active one matching the tool name
    fn find_active_mut(
        &mut self,
        tool_id: Option<&str>,
        tool_name: Option<&str>,
    ) -> Option<&mut Action> {
        let by_id = tool_id.and_then(|id| {
            self.actions
                .iter()
                .position(|a| a.status.is_active() && a.id == id)
        });
        let index = by_id.or_else(|| {
            tool_name.and_then(|name| {
                self.actions
                    .iter()
                    .position(|a| a.status.is_active() && a.tool_name.as_deref() == Some(name))
            })
        })?;
        self.actions.get_mut(index)
    }

    fn complete_active_plan(&mut self) {
        if let Some(plan) = self.plan.as_mut().filter(|p| p.status.is_active()) {
            plan.status = Status::Completed;
        }
    }

    fn set_active_actions(&mut self, status: Status) {
        for action in self.actions.iter_mut().filter(|a| a.status.is_active()) {
            action.status = status;
        }
    }
}

fn default_label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Tool => "Tool",
        ActionKind::Decision => ActivityKind::Decision.default_label(),
        ActionKind::Reading => ActivityKind::Reading.default_label(),
        ActionKind::Searching => ActivityKind::Searching.default_label(),
        ActionKind::Reviewing => ActivityKind::Reviewing.default_label(),
        ActionKind::Analyzing => ActivityKind::Analyzing.default_label(),
        ActionKind::Executing => ActivityKind::Executing.default_label(),
        ActionKind::Working => ActivityKind::Working.default_label(),
        ActionKind::Summarizing => "Summarizing",
    }
}

fn clamp_progress(progress: f64) -> Option<u8> {
    if progress.is_nan() {
        return None;
    }
    Some(progress.clamp(0.0, 100.0).round() as u8)
}

/// Split raw plan text into steps on newlines and inline bullets
pub fn parse_steps(raw: &str) -> Vec<String> {
    raw.split(['\n', '•'])
        .map(strip_marker)
        .filter(|step| !step.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*', '+']) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_start(name: &str, id: Option<&str>) -> Event {
        Event::ToolStart {
            tool_id: id.map(str::to_string),
            tool_name: name.to_string(),
            detail: None,
        }
    }

    fn tool_end(name: &str, outcome: ToolOutcome) -> Event {
        Event::ToolEnd {
            tool_id: None,
            tool_name: Some(name.to_string()),
            outcome,
            result: None,
            duration_ms: None,
        }
    }

    fn working(detail: &str) -> Event {
        Event::Activity {
            kind: ActivityKind::Working,
            label: None,
            detail: Some(detail.to_string()),
        }
    }

    #[test]
    fn test_parse_steps_bullets_and_numbers() {
        let steps = parse_steps("Plan:\n- read the file\n* find usages\n3. write tests\n4) ship");
        assert_eq!(
            steps,
            vec!["Plan:", "read the file", "find usages", "write tests", "ship"]
        );
    }

    #[test]
    fn test_parse_steps_inline_bullets_and_blank_lines() {
        let steps = parse_steps("• one • two\n\n  -  \n• three");
        assert_eq!(steps, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_parse_steps_keeps_emphasis() {
        assert_eq!(parse_steps("**Step** one"), vec!["**Step** one"]);
    }

    #[test]
    fn test_tool_start_then_end_by_name() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("readFile", Some("A")));
        timeline.apply(&tool_end("readFile", ToolOutcome::Completed));

        assert_eq!(timeline.actions.len(), 1);
        let action = &timeline.actions[0];
        assert_eq!(action.id, "A");
        assert_eq!(action.status, Status::Completed);
        assert_eq!(action.progress, Some(100));
    }

    #[test]
    fn test_tool_end_prefers_id_match() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("search", Some("s1")));
        timeline.apply(&tool_start("search", Some("s2")));
        timeline.apply(&Event::ToolEnd {
            tool_id: Some("s2".to_string()),
            tool_name: Some("search".to_string()),
            outcome: ToolOutcome::Failed,
            result: Some("timeout".to_string()),
            duration_ms: Some(5),
        });

        assert_eq!(timeline.actions[0].status, Status::Active);
        assert_eq!(timeline.actions[1].status, Status::Failed);
        assert_eq!(timeline.actions[1].result.as_deref(), Some("timeout"));
        assert_eq!(timeline.actions[1].duration_ms, Some(5));
    }

    #[test]
    fn test_tool_end_matches_first_active_by_name() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("grep", None));
        timeline.apply(&tool_start("grep", None));
        timeline.apply(&tool_end("grep", ToolOutcome::Completed));
        timeline.apply(&tool_end("grep", ToolOutcome::Completed));

        assert!(timeline
            .actions
            .iter()
            .all(|a| a.status == Status::Completed));
    }

    #[test]
    fn test_tool_end_twice_is_noop() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("readFile", None));
        timeline.apply(&tool_end("readFile", ToolOutcome::Completed));
        timeline.apply(&tool_end("readFile", ToolOutcome::Failed));

        assert_eq!(timeline.actions.len(), 1);
        assert_eq!(timeline.actions[0].status, Status::Completed);
    }

    #[test]
    fn test_tool_end_without_start_is_noop() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_end("ghost", ToolOutcome::Completed));
        assert!(timeline.actions.is_empty());
    }

    #[test]
    fn test_tool_progress_without_active_action_is_noop() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("readFile", Some("r1")));
        timeline.apply(&tool_end("readFile", ToolOutcome::Completed));
        let before = timeline.clone();

        for (id, name) in [(None, "ghost"), (Some("r1"), "readFile")] {
            timeline.apply(&Event::ToolProgress {
                tool_id: id.map(str::to_string),
                tool_name: Some(name.to_string()),
                detail: Some("late".to_string()),
                progress: Some(10.0),
            });
        }
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_tool_progress_clamped() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("download", None));
        for (raw, expected) in [(50.0, 50), (250.0, 100), (-3.0, 0), (33.6, 34)] {
            timeline.apply(&Event::ToolProgress {
                tool_id: None,
                tool_name: Some("download".to_string()),
                detail: Some("fetching".to_string()),
                progress: Some(raw),
            });
            assert_eq!(timeline.actions[0].progress, Some(expected));
        }
        assert_eq!(timeline.actions[0].detail.as_deref(), Some("fetching"));
    }

    #[test]
    fn test_tool_start_completes_active_plan() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::Planning {
            content: "- a\n- b".to_string(),
        });
        assert_eq!(timeline.plan.as_ref().unwrap().status, Status::Active);
        assert_eq!(timeline.plan.as_ref().unwrap().steps, vec!["a", "b"]);

        timeline.apply(&tool_start("readFile", None));
        assert_eq!(timeline.plan.as_ref().unwrap().status, Status::Completed);
    }

    #[test]
    fn test_planning_replaces_plan() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::Planning {
            content: "- a".to_string(),
        });
        timeline.apply(&tool_start("x", None));
        timeline.apply(&Event::Planning {
            content: "- b\n- c".to_string(),
        });
        let plan = timeline.plan.as_ref().unwrap();
        assert_eq!(plan.status, Status::Active);
        assert_eq!(plan.steps, vec!["b", "c"]);
        assert_eq!(plan.raw, "- b\n- c");
    }

    #[test]
    fn test_summarizing() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::Planning {
            content: "- a".to_string(),
        });
        timeline.apply(&Event::Summarizing);
        assert!(timeline.summarizing);
        assert_eq!(timeline.plan.as_ref().unwrap().status, Status::Completed);
    }

    #[test]
    fn test_thinking_lifecycle() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::ThinkingStart { content: None });
        timeline.apply(&Event::ThinkingUpdate {
            content: "Looking at".to_string(),
        });
        timeline.apply(&Event::ThinkingUpdate {
            content: "Looking at the parser".to_string(),
        });
        let thinking = timeline.thinking.as_ref().unwrap();
        assert_eq!(thinking.content, "Looking at the parser");
        assert_eq!(thinking.status, Status::Active);

        timeline.apply(&Event::ThinkingEnd { content: None });
        let thinking = timeline.thinking.as_ref().unwrap();
        assert_eq!(thinking.content, "Looking at the parser");
        assert_eq!(thinking.status, Status::Completed);
    }

    #[test]
    fn test_thinking_update_without_start_opens_block() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::ThinkingUpdate {
            content: "hmm".to_string(),
        });
        assert_eq!(timeline.thinking.as_ref().unwrap().status, Status::Active);
    }

    #[test]
    fn test_thinking_end_without_start_or_content_is_noop() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::ThinkingEnd { content: None });
        assert!(timeline.thinking.is_none());
    }

    #[test]
    fn test_working_dedup() {
        let mut timeline = Timeline::default();
        timeline.apply(&working("Indexing files"));
        timeline.apply(&working("Indexing files"));
        assert_eq!(timeline.actions.len(), 1);

        timeline.apply(&working("Indexing tests"));
        assert_eq!(timeline.actions.len(), 2);
    }

    #[test]
    fn test_working_dedup_only_against_immediate_predecessor() {
        let mut timeline = Timeline::default();
        timeline.apply(&working("Indexing"));
        timeline.apply(&Event::Activity {
            kind: ActivityKind::Reading,
            label: None,
            detail: Some("Indexing".to_string()),
        });
        timeline.apply(&working("Indexing"));
        assert_eq!(timeline.actions.len(), 3);
    }

    #[test]
    fn test_non_working_activities_are_not_deduped() {
        let mut timeline = Timeline::default();
        let reading = Event::Activity {
            kind: ActivityKind::Reading,
            label: None,
            detail: Some("lib.rs".to_string()),
        };
        timeline.apply(&reading);
        timeline.apply(&reading);
        assert_eq!(timeline.actions.len(), 2);
    }

    #[test]
    fn test_activity_labels() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::Activity {
            kind: ActivityKind::Searching,
            label: None,
            detail: Some("fn main".to_string()),
        });
        timeline.apply(&Event::Activity {
            kind: ActivityKind::Decision,
            label: Some("Use the cache".to_string()),
            detail: None,
        });
        assert_eq!(timeline.actions[0].label, "Searching");
        assert_eq!(timeline.actions[0].kind, ActionKind::Searching);
        assert_eq!(timeline.actions[1].label, "Use the cache");
    }

    #[test]
    fn test_narrated_action_stays_active_until_turn_ends() {
        let mut timeline = Timeline::default();
        timeline.apply(&working("Thinking it over"));
        timeline.apply(&tool_start("readFile", None));
        assert_eq!(timeline.actions[0].status, Status::Active);
        assert_eq!(timeline.actions[1].status, Status::Active);

        timeline.stop("Stopped by user");
        assert_eq!(timeline.actions[0].status, Status::Failed);
        assert_eq!(timeline.actions[1].status, Status::Failed);
    }

    #[test]
    fn test_terminal_output_streams_into_executing() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::Activity {
            kind: ActivityKind::Executing,
            label: None,
            detail: Some("cargo test".to_string()),
        });
        timeline.apply(&Event::TerminalOutput {
            output: "running 3 tests\n".to_string(),
        });
        timeline.apply(&Event::TerminalOutput {
            output: "test result: ok\n".to_string(),
        });
        assert_eq!(
            timeline.actions[0].terminal_output.as_deref(),
            Some("running 3 tests\ntest result: ok\n")
        );
    }

    #[test]
    fn test_terminal_output_targets_most_recent_command() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("run_command", Some("c1")));
        timeline.apply(&tool_start("run_command", Some("c2")));
        timeline.apply(&Event::TerminalOutput {
            output: "hi".to_string(),
        });
        assert_eq!(timeline.actions[0].terminal_output, None);
        assert_eq!(timeline.actions[1].terminal_output.as_deref(), Some("hi"));
    }

    #[test]
    fn test_terminal_output_without_command_is_dropped() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("readFile", None));
        timeline.apply(&Event::TerminalOutput {
            output: "stray".to_string(),
        });
        assert_eq!(timeline.actions[0].terminal_output, None);
    }

    #[test]
    fn test_settle_closes_blocks_and_narration() {
        let mut timeline = Timeline::default();
        timeline.apply(&Event::ThinkingStart { content: None });
        timeline.apply(&Event::Planning {
            content: "- a".to_string(),
        });
        timeline.apply(&Event::Summarizing);
        timeline.apply(&working("Scanning"));
        timeline.apply(&tool_start("x", None));
        timeline.apply(&tool_end("x", ToolOutcome::Completed));
        timeline.settle();

        assert_eq!(timeline.thinking.as_ref().unwrap().status, Status::Completed);
        assert_eq!(timeline.plan.as_ref().unwrap().status, Status::Completed);
        assert!(!timeline.summarizing);
        assert_eq!(timeline.active_actions().count(), 0);
        assert_eq!(timeline.actions[0].status, Status::Completed);
        assert_eq!(timeline.actions[1].status, Status::Completed);
    }

    #[test]
    fn test_settle_fails_tool_without_end() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("search", Some("t1")));
        timeline.settle();

        assert_eq!(timeline.actions[0].status, Status::Failed);
        assert_eq!(timeline.actions[0].progress, None);
    }

    #[test]
    fn test_stop_freezes_timeline() {
        let mut timeline = Timeline::default();
        timeline.apply(&tool_start("a", None));
        timeline.apply(&tool_start("b", None));
        timeline.apply(&tool_end("a", ToolOutcome::Completed));
        timeline.apply(&Event::Planning {
            content: "- next".to_string(),
        });
        timeline.apply(&Event::Summarizing);
        timeline.stop("Stopped by user");

        assert_eq!(timeline.actions[0].status, Status::Completed);
        assert_eq!(timeline.actions[1].status, Status::Failed);
        assert_eq!(timeline.plan.as_ref().unwrap().status, Status::Completed);
        assert!(!timeline.summarizing);
        assert_eq!(
            timeline.result,
            Some(TurnResult {
                summary: "Stopped by user".to_string()
            })
        );
    }
}
