//! Pipeline execution: command building and run orchestration.
//!
//! The pure command builder turns a resolved step selection into the
//! external tool's argument vector. The [`Runner`] wires the collaborator
//! seams together (document access, step picker, notifier, terminal) and is
//! the only layer that converts typed errors into user-facing messages.

use std::path::PathBuf;

use crate::context::{self, PipelineContext, Workspace};
use crate::error::{Error, Result};
use crate::pipeline::{self, Step};
use crate::prompt::{MultiSelectOption, MultiSelectPrompt, PromptEngine};
use crate::settings::{Settings, TOOL_COMMAND};
use crate::utils::{command, shell};

pub const EXEC_SUBCOMMAND: &str = "exec";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub trusted: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Argument vector for the tool's exec subcommand:
/// `exec <relative-path> [--trusted] [--include=<name>]* [--exclude=<name>]*`
///
/// Token order is fixed; include and exclude lists keep the order given.
/// The caller guarantees the two lists are disjoint.
pub fn build_exec_args(pipeline_file: &str, opts: &ExecOptions) -> Vec<String> {
    let mut args = Vec::with_capacity(2 + opts.include.len() + opts.exclude.len() + 1);
    args.push(EXEC_SUBCOMMAND.to_string());
    args.push(pipeline_file.to_string());

    if opts.trusted {
        args.push("--trusted".to_string());
    }
    for step in &opts.include {
        args.push(format!("--include={}", step));
    }
    for step in &opts.exclude {
        args.push(format!("--exclude={}", step));
    }

    args
}

/// Which steps a run request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    AllSteps,
    PickSteps,
    StepAtCursor,
}

/// Access to the currently focused pipeline document, if any.
///
/// Active text takes priority over the on-disk file so unsaved edits are
/// honored.
pub trait DocumentSource {
    fn active_text(&self) -> Option<String>;
    fn selection_text(&self) -> Option<String>;
}

/// Multi-select over the canonical step list. `None` means the picker was
/// dismissed (distinct from an empty pick).
pub trait StepPicker {
    fn pick_steps(&self, steps: &[Step]) -> Option<Vec<String>>;
}

/// User-facing reporting surface. Only the [`Runner`] talks to it.
pub trait Notifier {
    fn info(&self, message: &str);
    fn error(&self, error: &Error);
}

/// A fully prepared external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub label: Option<String>,
}

/// Dispatches a prepared invocation to a terminal. Once launched the core
/// holds no handle on the run: no cancellation, no timeout.
pub trait TerminalLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<()>;
}

/// What a run request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Dispatched(LaunchRequest),
    /// Picker returned nothing, or the cursor selection matched no step.
    NothingSelected,
    /// Picker dismissed without an answer.
    Cancelled,
    /// A reported failure; the tool was not invoked.
    Failed,
}

pub struct Runner<'a> {
    workspace: &'a dyn Workspace,
    documents: &'a dyn DocumentSource,
    picker: &'a dyn StepPicker,
    notifier: &'a dyn Notifier,
    terminal: &'a dyn TerminalLauncher,
    settings: Settings,
    context: Option<PipelineContext>,
}

impl<'a> Runner<'a> {
    pub fn new(
        workspace: &'a dyn Workspace,
        documents: &'a dyn DocumentSource,
        picker: &'a dyn StepPicker,
        notifier: &'a dyn Notifier,
        terminal: &'a dyn TerminalLauncher,
        settings: Settings,
    ) -> Self {
        Self {
            workspace,
            documents,
            picker,
            notifier,
            terminal,
            settings,
            context: None,
        }
    }

    pub fn context(&self) -> Option<&PipelineContext> {
        self.context.as_ref()
    }

    /// Drop and recompute the cached pipeline context.
    pub fn refresh_context(&mut self) -> Result<&PipelineContext> {
        self.context = Some(context::resolve(self.workspace)?);
        self.current_context()
    }

    fn ensure_context(&mut self) -> Result<&PipelineContext> {
        if self.context.is_none() {
            self.context = Some(context::resolve(self.workspace)?);
        }
        self.current_context()
    }

    fn current_context(&self) -> Result<&PipelineContext> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::internal_unexpected("pipeline context missing after refresh"))
    }

    pub fn run_all_steps(&mut self) -> RunOutcome {
        self.run_reported(RunMode::AllSteps)
    }

    pub fn run_picked_steps(&mut self) -> RunOutcome {
        self.run_reported(RunMode::PickSteps)
    }

    pub fn run_step_at_cursor(&mut self) -> RunOutcome {
        self.run_reported(RunMode::StepAtCursor)
    }

    /// Error boundary: anything that failed before (or while) dispatching is
    /// reported here and nowhere else. The tool is never invoked after a
    /// failure.
    fn run_reported(&mut self, mode: RunMode) -> RunOutcome {
        match self.run(mode) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notifier.error(&err);
                RunOutcome::Failed
            }
        }
    }

    /// Resolve text, select steps per mode, build the command, dispatch.
    pub fn run(&mut self, mode: RunMode) -> Result<RunOutcome> {
        let text = self.resolve_pipeline_text()?;
        let steps = pipeline::parse_steps(&text)?;
        let step_names: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();

        let include = match mode {
            RunMode::AllSteps => Vec::new(),
            RunMode::PickSteps => {
                let Some(picked) = self.picker.pick_steps(&steps) else {
                    return Ok(RunOutcome::Cancelled);
                };
                let selected = pipeline::reconcile(&step_names, &picked);
                if selected.is_empty() {
                    self.notifier.info("No steps selected to run");
                    return Ok(RunOutcome::NothingSelected);
                }
                selected
            }
            RunMode::StepAtCursor => {
                let requested = self.documents.selection_text().unwrap_or_default();
                let selected = pipeline::reconcile(&step_names, &[requested.clone()]);
                if selected.is_empty() {
                    self.notifier
                        .info(&format!("'{}' is not a step of this pipeline", requested));
                    return Ok(RunOutcome::NothingSelected);
                }
                selected
            }
        };

        let opts = ExecOptions {
            trusted: self.settings.run_trusted,
            include,
            exclude: Vec::new(),
        };

        self.dispatch_exec(&text, &opts)
    }

    fn dispatch_exec(&mut self, text: &str, opts: &ExecOptions) -> Result<RunOutcome> {
        let program = self.settings.resolve_tool_binary()?;
        let ctx = self.ensure_context()?;

        let args = build_exec_args(&ctx.relative_file(), opts);
        let label = pipeline::pipeline_name(text).ok().flatten();

        let request = LaunchRequest {
            program,
            args,
            cwd: ctx.workspace_root.clone(),
            label,
        };

        self.terminal.launch(&request)?;
        Ok(RunOutcome::Dispatched(request))
    }

    /// Active document text when an editor is focused; otherwise the
    /// on-disk pipeline file, resolving the context first if needed.
    fn resolve_pipeline_text(&mut self) -> Result<String> {
        if let Some(text) = self.documents.active_text() {
            return Ok(text);
        }
        let ctx = self.ensure_context()?;
        ctx.read_file()
    }
}

/// Shell line the git post-commit hook replays: the full-pipeline exec
/// command with the current trust setting.
pub fn hook_command_line(settings: &Settings, ctx: &PipelineContext) -> String {
    let program = settings
        .resolve_tool_binary()
        .unwrap_or_else(|_| TOOL_COMMAND.to_string());
    let opts = ExecOptions {
        trusted: settings.run_trusted,
        ..Default::default()
    };
    shell::command_line(&program, &build_exec_args(&ctx.relative_file(), &opts))
}

// --- default collaborator implementations -------------------------------

/// Runs the invocation as an interactive shell command, inheriting stdio.
pub struct TerminalProcessLauncher;

impl TerminalLauncher for TerminalProcessLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        let line = shell::command_line(&request.program, &request.args);
        match &request.label {
            Some(label) => log_status!("exec", "{}: {}", label, line),
            None => log_status!("exec", "{}", line),
        }

        let exit_code = command::run_interactive(&line, Some(&request.cwd))?;
        if exit_code != 0 {
            log_status!("exec", "Pipeline exited with code {}", exit_code);
        }
        Ok(())
    }
}

/// Step picker backed by the stdin/stderr prompt engine.
pub struct PromptStepPicker {
    engine: PromptEngine,
}

impl PromptStepPicker {
    pub fn new(engine: PromptEngine) -> Self {
        Self { engine }
    }
}

impl StepPicker for PromptStepPicker {
    fn pick_steps(&self, steps: &[Step]) -> Option<Vec<String>> {
        let options = steps
            .iter()
            .map(|s| MultiSelectOption {
                value: s.name.clone(),
                label: match &s.image {
                    Some(image) => format!("{} ({})", s.name, image),
                    None => s.name.clone(),
                },
            })
            .collect();

        self.engine.multi_select(&MultiSelectPrompt {
            title: "Select pipeline steps to run".to_string(),
            options,
        })
    }
}

/// Reporting to stderr, hints included.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn info(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, error: &Error) {
        eprintln!("error[{}]: {}", error.code.as_str(), error.message);
        for hint in &error.hints {
            eprintln!("  hint: {}", hint.message);
        }
    }
}

/// Document source with no focused editor: no active text, selection passed
/// explicitly (the `step <name>` argument).
pub struct ExplicitSelection {
    selection: Option<String>,
}

impl ExplicitSelection {
    pub fn new(selection: Option<String>) -> Self {
        Self { selection }
    }
}

impl DocumentSource for ExplicitSelection {
    fn active_text(&self) -> Option<String> {
        None
    }

    fn selection_text(&self) -> Option<String> {
        self.selection.clone()
    }
}

/// Document source for piped input: stdin text acts as the focused
/// document, so edits that never hit disk still run.
pub struct PipedDocument {
    text: String,
    selection: Option<String>,
}

impl PipedDocument {
    pub fn new(text: String, selection: Option<String>) -> Self {
        Self { text, selection }
    }
}

impl DocumentSource for PipedDocument {
    fn active_text(&self) -> Option<String> {
        Some(self.text.clone())
    }

    fn selection_text(&self) -> Option<String> {
        self.selection.clone()
    }
}
