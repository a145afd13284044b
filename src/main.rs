use autorerename::action::{self, ActionLogReader, ActionLogWriter, Renamer};
use autorerename::apply::{ApplyOptions, ApplySummary, Candidate, Orchestrator, RuleSource};
use autorerename::cli::{
    Args, Command, LogCommand, RenameArgs, RuleAddArgs, RuleCommand, ScanArgs, SelectArgs,
};
use autorerename::config::{Config, Overrides};
use autorerename::error::{AppError, ExitCode};
use autorerename::output::Output;
use autorerename::prompt::LinePrompt;
use autorerename::rule::{Catalog, Rule, RuleSpec};
use autorerename::scanner::{self, ScanOptions};
use autorerename::{logging, store};
use clap::Parser;
use std::io::Stdout;
use tracing::{debug, error, info, warn};

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(args.verbose);

    let code = match run(args) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!("{}", e);
            eprintln!("\nError: {}", e.detailed_message());
            e.exit_code()
        }
    };
    std::process::exit(code.into());
}

fn run(args: Args) -> Result<(), AppError> {
    let config = Config::resolve(&Overrides {
        config: args.config,
        rules_db: args.rules_db,
        action_log: args.action_log,
    })?;
    debug!(?config, "Configuration resolved");

    let mut out = Output::stdout();

    match args.command {
        Command::Rule(RuleCommand::Add(add)) => rule_add(&config, add, &mut out),
        Command::Rule(RuleCommand::Remove { rule }) => rule_remove(&config, &rule, &mut out),
        Command::Rule(RuleCommand::List) => {
            let catalog = store::load(&config.rule_db_path)?;
            if catalog.is_empty() {
                out.message("No rules registered.")?;
            }
            for rule in catalog.iter() {
                out.rule(rule)?;
            }
            Ok(())
        }
        Command::Rule(RuleCommand::Test { paths }) => {
            let catalog = store::load(&config.rule_db_path)?;
            for path in &paths {
                let mut any = false;
                for hit in catalog.find_applying(path, None) {
                    any = true;
                    match hit.destination() {
                        Ok(dest) => out.candidate(hit.rule, path, &dest)?,
                        Err(e) => {
                            warn!("Rule {} cannot name {:?}: {}", hit.rule.id(), path, e);
                            out.format_failure(&hit.rule.name_prefix(), path, &e.to_string())?;
                        }
                    }
                }
                if !any {
                    out.message(&format!("{}: no rule applies", path.display()))?;
                }
            }
            Ok(())
        }
        Command::Rename(rename) => rename_paths(&config, rename, &mut out),
        Command::Scan(scan) => scan_roots(&config, scan, &mut out),
        Command::Log(LogCommand::Show { incomplete }) => {
            let mut shown = 0;
            for line in ActionLogReader::open(&config.action_log_path)? {
                let line = line?;
                if incomplete && line.is_complete() {
                    continue;
                }
                out.log_line(&line)?;
                shown += 1;
            }
            if shown == 0 {
                out.message("No history.")?;
            }
            Ok(())
        }
        Command::Log(LogCommand::Clear) => {
            action::clear(&config.action_log_path)?;
            info!("Action log cleared");
            out.message("Action log cleared.")?;
            Ok(())
        }
    }
}

fn rule_add(
    config: &Config,
    add: RuleAddArgs,
    out: &mut Output<Stdout>,
) -> Result<(), AppError> {
    let mut catalog = store::load(&config.rule_db_path)?;

    let mut spec = RuleSpec::new(add.pattern, add.template).with_height(add.height);
    spec.id = add.id.clone();
    spec.name = add.name;

    let id = match catalog.add(spec)? {
        Some(rule) => rule.id().to_string(),
        None => return Err(AppError::DuplicateRule(add.id.unwrap_or_default())),
    };

    store::save(&config.rule_db_path, &catalog)?;
    out.message(&id)?;
    Ok(())
}

fn rule_remove(
    config: &Config,
    key: &str,
    out: &mut Output<Stdout>,
) -> Result<(), AppError> {
    let mut catalog = store::load(&config.rule_db_path)?;

    if !catalog.remove(key) {
        return Err(AppError::RuleNotFound(key.to_string()));
    }

    store::save(&config.rule_db_path, &catalog)?;
    out.message(&format!("Removed {}", key))?;
    Ok(())
}

fn rename_paths(
    config: &Config,
    args: RenameArgs,
    out: &mut Output<Stdout>,
) -> Result<(), AppError> {
    let candidates: Vec<Candidate> = args.paths.into_iter().map(Candidate::given).collect();
    apply(config, &args.select, candidates, out)
}

fn scan_roots(
    config: &Config,
    args: ScanArgs,
    out: &mut Output<Stdout>,
) -> Result<(), AppError> {
    let options = ScanOptions {
        recursive: args.recursive,
        max_depth: args.max_depth,
    };
    let files = scanner::scan(&args.roots, options)?;
    info!("Found {} files", files.len());

    let candidates: Vec<Candidate> = files.into_iter().map(Candidate::found).collect();
    apply(config, &args.select, candidates, out)
}

fn apply(
    config: &Config,
    select: &SelectArgs,
    candidates: Vec<Candidate>,
    out: &mut Output<Stdout>,
) -> Result<(), AppError> {
    let manual = match (&select.pattern, &select.template) {
        (Some(pattern), Some(template)) => {
            let height = select.height.unwrap_or(0);
            Some(Rule::manual(pattern, template, height)?)
        }
        _ => None,
    };

    let catalog = match manual {
        Some(_) => Catalog::new(),
        None => store::load(&config.rule_db_path)?,
    };

    let rules = match &manual {
        Some(rule) => RuleSource::Manual(rule),
        None => {
            if let Some(key) = select.rule.as_deref() {
                if catalog.get(key).is_none() {
                    return Err(AppError::RuleNotFound(key.to_string()));
                }
            }
            RuleSource::Catalog {
                catalog: &catalog,
                only: select.rule.as_deref(),
            }
        }
    };

    let options = ApplyOptions {
        simulate: select.simulate,
        confirm: select.confirm,
    };

    let mut renamer = Renamer::new(ActionLogWriter::open(&config.action_log_path)?);
    let mut prompt = LinePrompt::stdio();

    let summary: ApplySummary = {
        let mut orchestrator = Orchestrator::new(rules, &mut renamer, out, options);
        if options.confirm {
            orchestrator = orchestrator.with_prompt(&mut prompt);
        }
        orchestrator.run(candidates)?
    };
    renamer.finish()?;

    debug!(?summary, "Apply finished");
    if summary.aborted {
        out.message("Aborted.")?;
    }
    if summary.attempts == 0 && !summary.aborted {
        info!("No rule applied to {} files", summary.files);
    }

    Ok(())
}
