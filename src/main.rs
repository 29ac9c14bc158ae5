use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::process::ExitCode;

use wingman::context::{self, LocalWorkspace, Workspace};
use wingman::exec::{
    self, DocumentSource, ExplicitSelection, Notifier, PipedDocument, PromptStepPicker, RunMode,
    RunOutcome, Runner, StderrNotifier, TerminalProcessLauncher,
};
use wingman::install::{self, GithubReleaseIndex, HttpDownloader, ZipExtractor};
use wingman::log_status;
use wingman::output;
use wingman::prompt::{PromptEngine, YesNoPrompt};
use wingman::settings::{self, Settings};
use wingman::update_check;
use wingman::{Error, ErrorCode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "wingman")]
#[command(version = VERSION)]
#[command(about = "Run Drone CI pipelines locally")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every step of the pipeline
    Run(RunArgs),
    /// Pick which pipeline steps to run
    Steps(RunArgs),
    /// Run a single named pipeline step
    Step(StepArgs),
    /// Show where the drone cli lives and which version it is
    About,
    /// Download the drone cli, or upgrade an existing install
    Install(InstallArgs),
    /// Alias for install
    #[command(hide = true)]
    Upgrade(InstallArgs),
    /// Read or write wingman settings
    Config(ConfigArgs),
    /// Create a default pipeline file in the workspace
    Init,
}

#[derive(Args)]
struct RunArgs {
    /// Read pipeline YAML from stdin instead of the pipeline file
    #[arg(long)]
    stdin: bool,
}

#[derive(Args)]
struct StepArgs {
    /// Name of the step to run
    name: String,
    /// Read pipeline YAML from stdin instead of the pipeline file
    #[arg(long)]
    stdin: bool,
}

#[derive(Args)]
struct InstallArgs {
    /// Reinstall even when already at the latest version
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show a settings value
    Get { key: String },
    /// Set a settings value
    Set { key: String, value: String },
    /// Print the settings file location
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(err) => return output::finish::<serde_json::Value>(Err(err)),
    };

    if !matches!(cli.command, Commands::Install(_) | Commands::Upgrade(_)) {
        update_check::run_startup_check(&settings);
    }

    match cli.command {
        Commands::Run(args) => run_pipeline(RunMode::AllSteps, args.stdin, None, settings),
        Commands::Steps(args) => run_pipeline(RunMode::PickSteps, args.stdin, None, settings),
        Commands::Step(args) => {
            run_pipeline(RunMode::StepAtCursor, args.stdin, Some(args.name), settings)
        }
        Commands::About => output::finish(install::about(&settings)),
        Commands::Install(args) | Commands::Upgrade(args) => run_install(settings, args.force),
        Commands::Config(args) => run_config(settings, args.command),
        Commands::Init => run_init(),
    }
}

/// Interactive passthrough: the pipeline runs in this terminal, reporting
/// goes to stderr, no JSON envelope.
fn run_pipeline(
    mode: RunMode,
    use_stdin: bool,
    selection: Option<String>,
    settings: Settings,
) -> ExitCode {
    let notifier = StderrNotifier;

    let workspace = match LocalWorkspace::from_current_dir() {
        Ok(ws) => ws,
        Err(err) => {
            notifier.error(&err);
            return ExitCode::from(1);
        }
    };

    let documents: Box<dyn DocumentSource> = if use_stdin {
        let mut text = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut text) {
            notifier.error(&Error::internal_io(
                e.to_string(),
                Some("read stdin".to_string()),
            ));
            return ExitCode::from(1);
        }
        Box::new(PipedDocument::new(text, selection))
    } else {
        Box::new(ExplicitSelection::new(selection))
    };

    let engine = PromptEngine::new();
    let picker = PromptStepPicker::new(PromptEngine::new());
    let terminal = TerminalProcessLauncher;

    let mut runner = Runner::new(
        &workspace,
        documents.as_ref(),
        &picker,
        &notifier,
        &terminal,
        settings,
    );

    if !ensure_pipeline_context(&mut runner, &workspace, &engine, &notifier) {
        return ExitCode::from(4);
    }

    let outcome = match mode {
        RunMode::AllSteps => runner.run_all_steps(),
        RunMode::PickSteps => runner.run_picked_steps(),
        RunMode::StepAtCursor => runner.run_step_at_cursor(),
    };

    match outcome {
        RunOutcome::Failed => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    }
}

/// Resolve the pipeline context up front so the missing-file recovery runs
/// before any mode logic. Accepting the offer writes the skeleton and
/// re-resolves.
fn ensure_pipeline_context(
    runner: &mut Runner<'_>,
    workspace: &LocalWorkspace,
    engine: &PromptEngine,
    notifier: &StderrNotifier,
) -> bool {
    match runner.refresh_context() {
        Ok(_) => true,
        Err(err) if err.code == ErrorCode::PipelineNotFound => {
            notifier.error(&err);
            let create = engine.yes_no(&YesNoPrompt {
                question: "No pipeline file exists, create a default one?".to_string(),
                default: false,
            });
            if !create {
                return false;
            }
            if let Err(err) = context::create_default_pipeline_file(workspace.root()) {
                notifier.error(&err);
                return false;
            }
            match runner.refresh_context() {
                Ok(_) => true,
                Err(err) => {
                    notifier.error(&err);
                    false
                }
            }
        }
        Err(err) => {
            notifier.error(&err);
            false
        }
    }
}

fn run_install(mut settings: Settings, force: bool) -> ExitCode {
    let result = GithubReleaseIndex::new(false).and_then(|index| {
        install::install_or_upgrade(
            &mut settings,
            &index,
            &HttpDownloader,
            &ZipExtractor,
            &PromptEngine::new(),
            force,
        )
    });
    output::finish(result)
}

fn run_config(mut settings: Settings, command: ConfigCommand) -> ExitCode {
    match command {
        ConfigCommand::Get { key } => output::finish(
            settings
                .get_key(&key)
                .map(|value| serde_json::json!({ "key": key, "value": value })),
        ),
        ConfigCommand::Set { key, value } => {
            output::finish(apply_config_change(&mut settings, &key, &value))
        }
        ConfigCommand::Path => output::finish(
            settings::settings_file_path()
                .map(|path| serde_json::json!({ "path": path.to_string_lossy() })),
        ),
    }
}

/// Write the key, then reconcile the git post-commit hook: run-on-commit
/// toggles it, and trust/tool-path changes regenerate its command line.
fn apply_config_change(
    settings: &mut Settings,
    key: &str,
    value: &str,
) -> wingman::Result<serde_json::Value> {
    settings.set_key(key, value)?;
    settings.save()?;

    let hook_synced = sync_git_hook(settings);

    Ok(serde_json::json!({
        "key": key,
        "value": settings.get_key(key)?,
        "hookSynced": hook_synced,
    }))
}

fn sync_git_hook(settings: &Settings) -> bool {
    let Ok(workspace) = LocalWorkspace::from_current_dir() else {
        return false;
    };
    // No pipeline file means nothing to hook up yet.
    let Ok(ctx) = context::resolve(&workspace) else {
        return false;
    };

    let line = exec::hook_command_line(settings, &ctx);
    match ctx.hook.sync(settings.run_on_commit, &line) {
        Ok(()) => true,
        Err(err) => {
            log_status!("hook", "Hook sync skipped: {}", err);
            false
        }
    }
}

fn run_init() -> ExitCode {
    let result = LocalWorkspace::from_current_dir().and_then(|ws| {
        context::create_default_pipeline_file(ws.root())
            .map(|path| serde_json::json!({ "created": path.to_string_lossy() }))
    });
    output::finish(result)
}
