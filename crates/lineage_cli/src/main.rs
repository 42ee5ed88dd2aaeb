//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lineage_core` linkage with deterministic ping/version output.
//! - Given a database path, list lineages with their graph diagnostics.
//!
//! Usage: `lineage_cli [DB_PATH]`. Set `LINEAGE_LOG_DIR` (absolute) to enable
//! file logging.

use lineage_core::{
    default_log_level, init_logging, open_db, LineageService, RecordStore, SqliteRecordStore,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("lineage_core ping={}", lineage_core::ping());
    println!("lineage_core version={}", lineage_core::core_version());

    if let Ok(log_dir) = std::env::var("LINEAGE_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match list_lineages(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn list_lineages(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let service = LineageService::new(SqliteRecordStore::try_new(&conn)?);
    let lineages = service.store().list_lineages()?;
    info!(
        "event=cli_list module=cli status=ok lineages={}",
        lineages.len()
    );

    for lineage in lineages {
        let graph = service.load_graph(lineage.id)?;
        let diagnostics = &graph.diagnostics;
        println!(
            "{} persons={} skipped_edges={} duplicate_edges={} has_parent_cycle={} name={}",
            lineage.id,
            graph.len(),
            diagnostics.skipped_edges,
            diagnostics.duplicate_edges,
            diagnostics.has_parent_cycle,
            lineage.name
        );
    }
    Ok(())
}
