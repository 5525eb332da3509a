//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `fieldnote_core` linkage.
//! - Exercise the configured store without Flutter/FFI runtime setup.
//!
//! Usage: `fieldnote_cli [seed [count] | list | tags | sweep]`

use fieldnote_core::service::sample_data::sample_notes;
use fieldnote_core::{
    init_logging_from_env, NoteService, SqliteNoteRepository, Store, StoreConfig,
};
use log::info;
use std::process::ExitCode;

const DEFAULT_SEED_COUNT: usize = 10;

fn main() -> ExitCode {
    if let Err(err) = init_logging_from_env() {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("fieldnote_core ping={}", fieldnote_core::ping());
        println!("fieldnote_core version={}", fieldnote_core::core_version());
        return ExitCode::SUCCESS;
    };

    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid store configuration: {err}");
            return ExitCode::from(2);
        }
    };
    let mut store = Store::open_or_exit(&config);
    let repo = match SqliteNoteRepository::try_new(store.connection_mut()) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("store not ready: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut service = NoteService::new(repo);

    match run(command, &args[1..], &mut service) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{command} failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: &str,
    rest: &[String],
    service: &mut NoteService<SqliteNoteRepository<'_>>,
) -> Result<(), String> {
    match command {
        "seed" => {
            let count = match rest.first() {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| format!("invalid count `{raw}`"))?,
                None => DEFAULT_SEED_COUNT,
            };
            let notes = sample_notes(count);
            let report = service.import_notes(notes).map_err(|err| err.to_string())?;
            info!(
                "event=cli_seed module=cli status=ok inserted={} reassigned={}",
                report.ids.len(),
                report.reassigned.len()
            );
            println!("seeded {} note(s)", report.ids.len());
        }
        "list" => {
            let listed = service
                .list_notes(None, Some(50), 0)
                .map_err(|err| err.to_string())?;
            for note in listed.items {
                println!("{} {} [{}]", note.uuid, note.title, note.tags.join(", "));
            }
        }
        "tags" => {
            for tag in service.list_tags().map_err(|err| err.to_string())? {
                println!("{} ({})", tag.name, tag.note_count);
            }
        }
        "sweep" => {
            let report = service.sweep_orphan_tags();
            if let Some(err) = report.error {
                return Err(err);
            }
            println!("removed {} orphan tag(s)", report.deleted.len());
        }
        other => return Err(format!("unknown command `{other}`")),
    }
    Ok(())
}

