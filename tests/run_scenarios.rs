//! End-to-end run orchestration scenarios with stub collaborators.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use wingman::exec::{
    DocumentSource, LaunchRequest, Notifier, RunOutcome, Runner, StepPicker, TerminalLauncher,
};
use wingman::context::LocalWorkspace;
use wingman::pipeline::{self, Step};
use wingman::settings::Settings;
use wingman::{Error, Result};

struct StubDocuments {
    active: Option<String>,
    selection: Option<String>,
}

impl StubDocuments {
    fn none() -> Self {
        Self {
            active: None,
            selection: None,
        }
    }

    fn selection(text: &str) -> Self {
        Self {
            active: None,
            selection: Some(text.to_string()),
        }
    }
}

impl DocumentSource for StubDocuments {
    fn active_text(&self) -> Option<String> {
        self.active.clone()
    }

    fn selection_text(&self) -> Option<String> {
        self.selection.clone()
    }
}

struct StubPicker {
    picks: Option<Vec<String>>,
}

impl StepPicker for StubPicker {
    fn pick_steps(&self, _steps: &[Step]) -> Option<Vec<String>> {
        self.picks.clone()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    infos: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }

    fn error(&self, error: &Error) {
        self.errors.borrow_mut().push(error.code.as_str().to_string());
    }
}

#[derive(Default)]
struct RecordingTerminal {
    launches: RefCell<Vec<LaunchRequest>>,
}

impl TerminalLauncher for RecordingTerminal {
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        self.launches.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Workspace with a pipeline file and a fake tool binary to resolve.
struct Fixture {
    dir: TempDir,
    tool: PathBuf,
}

impl Fixture {
    fn new(pipeline_yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".drone.yml"), pipeline_yaml).unwrap();
        let tool = dir.path().join("drone");
        fs::write(&tool, "").unwrap();
        Self { dir, tool }
    }

    fn workspace(&self) -> LocalWorkspace {
        LocalWorkspace::new(self.dir.path())
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.tool_path.base = Some(self.tool.to_string_lossy().to_string());
        settings
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const BUILD_TEST_DEPLOY: &str = "\
kind: pipeline
name: greeting
steps:
  - name: build
    image: golang
  - name: test
    image: golang
  - name: deploy
    image: plugins/ssh
";

#[test]
fn picked_steps_run_in_pipeline_order() {
    let fixture = Fixture::new(BUILD_TEST_DEPLOY);
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker {
        picks: Some(strings(&["deploy", "build"])),
    };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_picked_steps();

    assert!(matches!(outcome, RunOutcome::Dispatched(_)));
    let launches = terminal.launches.borrow();
    assert_eq!(launches.len(), 1);
    assert_eq!(
        launches[0].args,
        strings(&["exec", ".drone.yml", "--include=build", "--include=deploy"])
    );
    assert_eq!(launches[0].cwd, fixture.dir.path());
    assert_eq!(launches[0].label.as_deref(), Some("greeting"));
}

#[test]
fn empty_pick_reports_and_skips_the_tool() {
    let fixture = Fixture::new("steps:\n  - name: lint\n    image: x\n  - name: test\n    image: x\n");
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker {
        picks: Some(Vec::new()),
    };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_picked_steps();

    assert_eq!(outcome, RunOutcome::NothingSelected);
    assert!(terminal.launches.borrow().is_empty());
    assert_eq!(
        notifier.infos.borrow().as_slice(),
        ["No steps selected to run"]
    );
}

#[test]
fn dismissed_picker_is_cancelled_silently() {
    let fixture = Fixture::new(BUILD_TEST_DEPLOY);
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_picked_steps();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(terminal.launches.borrow().is_empty());
    assert!(notifier.infos.borrow().is_empty());
}

#[test]
fn two_document_pipeline_runs_all_steps() {
    let yaml = "\
name: first
steps:
  - name: a
    image: x
  - name: b
    image: x
---
name: second
steps:
  - name: c
    image: x
";
    assert_eq!(pipeline::parse_step_names(yaml).unwrap(), strings(&["a", "b", "c"]));

    let fixture = Fixture::new(yaml);
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_all_steps();

    assert!(matches!(outcome, RunOutcome::Dispatched(_)));
    let launches = terminal.launches.borrow();
    assert_eq!(launches[0].args, strings(&["exec", ".drone.yml"]));
    assert_eq!(launches[0].label.as_deref(), Some("first"));
}

#[test]
fn cursor_selection_runs_single_step() {
    let fixture = Fixture::new("steps:\n  - name: build\n    image: x\n  - name: test\n    image: x\n");
    let workspace = fixture.workspace();
    let documents = StubDocuments::selection("test");
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_step_at_cursor();

    assert!(matches!(outcome, RunOutcome::Dispatched(_)));
    let launches = terminal.launches.borrow();
    assert_eq!(
        launches[0].args,
        strings(&["exec", ".drone.yml", "--include=test"])
    );
}

#[test]
fn cursor_typo_matches_nothing_and_never_invokes_the_tool() {
    let fixture = Fixture::new("steps:\n  - name: build\n    image: x\n  - name: deploy\n    image: x\n");
    let workspace = fixture.workspace();
    let documents = StubDocuments::selection("deplyo");
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_step_at_cursor();

    assert_eq!(outcome, RunOutcome::NothingSelected);
    assert!(terminal.launches.borrow().is_empty());
    assert_eq!(notifier.infos.borrow().len(), 1);
    assert!(notifier.infos.borrow()[0].contains("deplyo"));
}

#[test]
fn trusted_flag_follows_the_path_token() {
    let fixture = Fixture::new(BUILD_TEST_DEPLOY);
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut settings = fixture.settings();
    settings.run_trusted = true;

    let mut runner = Runner::new(&workspace, &documents, &picker, &notifier, &terminal, settings);
    runner.run_all_steps();

    let launches = terminal.launches.borrow();
    assert_eq!(
        launches[0].args,
        strings(&["exec", ".drone.yml", "--trusted"])
    );
}

#[test]
fn active_document_text_overrides_disk_content() {
    // Disk has one step; the unsaved editor buffer has another.
    let fixture = Fixture::new("steps:\n  - name: old\n    image: x\n");
    let workspace = fixture.workspace();
    let documents = StubDocuments {
        active: Some("name: edited\nsteps:\n  - name: fresh\n    image: x\n".to_string()),
        selection: Some("fresh".to_string()),
    };
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_step_at_cursor();

    assert!(matches!(outcome, RunOutcome::Dispatched(_)));
    let launches = terminal.launches.borrow();
    assert_eq!(
        launches[0].args,
        strings(&["exec", ".drone.yml", "--include=fresh"])
    );
    assert_eq!(launches[0].label.as_deref(), Some("edited"));
}

#[test]
fn malformed_yaml_fails_before_dispatch() {
    let fixture = Fixture::new("steps:\n  - name: [broken\n");
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );
    let outcome = runner.run_all_steps();

    assert_eq!(outcome, RunOutcome::Failed);
    assert!(terminal.launches.borrow().is_empty());
    assert_eq!(notifier.errors.borrow().as_slice(), ["pipeline.parse_error"]);
}

#[test]
fn missing_pipeline_file_is_reported_then_refresh_recovers() {
    let dir = TempDir::new().unwrap();
    let tool = dir.path().join("drone");
    fs::write(&tool, "").unwrap();

    let workspace = LocalWorkspace::new(dir.path());
    let documents = StubDocuments::none();
    let picker = StubPicker { picks: None };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut settings = Settings::default();
    settings.tool_path.base = Some(tool.to_string_lossy().to_string());

    let mut runner = Runner::new(&workspace, &documents, &picker, &notifier, &terminal, settings);

    assert_eq!(runner.run_all_steps(), RunOutcome::Failed);
    assert_eq!(notifier.errors.borrow().as_slice(), ["pipeline.not_found"]);

    // The recovery flow writes the file; an explicit refresh picks it up.
    fs::write(dir.path().join(".drone.yml"), BUILD_TEST_DEPLOY).unwrap();
    runner.refresh_context().unwrap();

    assert!(matches!(runner.run_all_steps(), RunOutcome::Dispatched(_)));
    assert_eq!(terminal.launches.borrow().len(), 1);
}

#[test]
fn reruns_resolve_independently() {
    let fixture = Fixture::new(BUILD_TEST_DEPLOY);
    let workspace = fixture.workspace();
    let documents = StubDocuments::none();
    let picker = StubPicker {
        picks: Some(strings(&["build"])),
    };
    let notifier = RecordingNotifier::default();
    let terminal = RecordingTerminal::default();

    let mut runner = Runner::new(
        &workspace,
        &documents,
        &picker,
        &notifier,
        &terminal,
        fixture.settings(),
    );

    runner.run_picked_steps();
    runner.run_picked_steps();

    let launches = terminal.launches.borrow();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0], launches[1]);
}
