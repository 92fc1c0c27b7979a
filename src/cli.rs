use std::fs;

use serde::Serialize;
use serde_json::json;

use crate::catalog::{load_catalog_or_builtin, CatalogOrigin, Category};
use crate::config::Settings;
use crate::ledger::{currency_from_f64, Ledger, LedgerError, TableQuery, Transaction};
use crate::logging::init_logging;
use crate::optimizer::{recommend, Strategy};
use crate::persistence::{
    export_json, import_document, restore_ledger, save_snapshot, DirStore, SnapshotStore,
};
use crate::server;

const USAGE: &str = "usage: upgrade_ledger <serve|catalog|status|recommend|buy|sell|set|max|money|strategy|reset|export|import|clear>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Catalog,
    Status,
    Recommend,
    Buy,
    Sell,
    Set,
    Max,
    Money,
    Strategy,
    Reset,
    Export,
    Import,
    Clear,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("catalog") => Some(Command::Catalog),
        Some("status") => Some(Command::Status),
        Some("recommend") => Some(Command::Recommend),
        Some("buy") => Some(Command::Buy),
        Some("sell") => Some(Command::Sell),
        Some("set") => Some(Command::Set),
        Some("max") => Some(Command::Max),
        Some("money") => Some(Command::Money),
        Some("strategy") => Some(Command::Strategy),
        Some("reset") => Some(Command::Reset),
        Some("export") => Some(Command::Export),
        Some("import") => Some(Command::Import),
        Some("clear") => Some(Command::Clear),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let settings = Settings::from_env();
    init_logging(&settings);
    run(args, &settings)
}

pub fn run(args: &[String], settings: &Settings) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let handler: fn(&mut CliSession, &[String]) -> i32 = match command {
        Command::Serve => return handle_serve(settings),
        Command::Catalog => handle_catalog,
        Command::Status => handle_status,
        Command::Recommend => handle_recommend,
        Command::Buy => handle_buy,
        Command::Sell => handle_sell,
        Command::Set => handle_set,
        Command::Max => handle_max,
        Command::Money => handle_money,
        Command::Strategy => handle_strategy,
        Command::Reset => handle_reset,
        Command::Export => handle_export,
        Command::Import => handle_import,
        Command::Clear => handle_clear,
    };

    let mut session = CliSession::open(settings);
    handler(&mut session, args)
}

/// Ledger restored from the state directory for the duration of one command.
struct CliSession {
    ledger: Ledger,
    store: DirStore,
    origin: CatalogOrigin,
}

impl CliSession {
    fn open(settings: &Settings) -> Self {
        let load = load_catalog_or_builtin(settings.catalog.as_deref());
        if let Some(notice) = &load.notice {
            eprintln!("warning: {notice}");
        }
        let mut ledger = Ledger::new(load.catalog);
        let store = DirStore::new(&settings.state_dir);
        restore_ledger(&store, &mut ledger);
        Self {
            ledger,
            store,
            origin: load.origin,
        }
    }

    /// Persist the snapshot, then print `payload`.
    fn commit<T: Serialize>(&mut self, payload: &T) -> i32 {
        if let Err(err) = save_snapshot(&mut self.store, &self.ledger) {
            eprintln!("failed to save state: {err}");
            return 1;
        }
        emit(payload)
    }
}

fn emit<T: Serialize>(payload: &T) -> i32 {
    match serde_json::to_string_pretty(payload) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize output: {err}");
            1
        }
    }
}

fn rejected(err: LedgerError) -> i32 {
    eprintln!("rejected: {err}");
    1
}

fn handle_serve(settings: &Settings) -> i32 {
    match server::run_server(settings) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_catalog(session: &mut CliSession, _args: &[String]) -> i32 {
    emit(&json!({
        "origin": session.origin,
        "upgrades": session.ledger.catalog().upgrades(),
    }))
}

fn handle_status(session: &mut CliSession, args: &[String]) -> i32 {
    match parse_table_query(args) {
        Ok(query) => emit(&session.ledger.view(&query)),
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("usage: upgrade_ledger status [--affordable] [--hide-max] [--search <term>] [--category <damage|money|utility|special>]");
            2
        }
    }
}

fn parse_table_query(args: &[String]) -> Result<TableQuery, String> {
    let mut query = TableQuery::default();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--affordable" => query.affordable_only = true,
            "--hide-max" => query.hide_max_level = true,
            "--search" => query.search = Some(rest.next().ok_or("--search needs a term")?.clone()),
            "--category" => {
                let raw = rest.next().ok_or("--category needs a value")?;
                query.category = Some(raw.parse::<Category>().map_err(|err| err.to_string())?);
            }
            other => return Err(format!("unknown flag '{other}'")),
        }
    }
    Ok(query)
}

fn handle_recommend(session: &mut CliSession, args: &[String]) -> i32 {
    let affordable = args.iter().skip(2).any(|arg| arg == "--affordable");
    emit(&json!({ "recommendation": recommend(&session.ledger, affordable) }))
}

fn handle_buy(session: &mut CliSession, args: &[String]) -> i32 {
    let (Some(name), Some(count)) = (args.get(2), parse_count_arg(args.get(3))) else {
        eprintln!("usage: upgrade_ledger buy <upgrade> [count]");
        return 2;
    };
    match session.ledger.buy(name, count) {
        Ok(tx) => {
            report_clamped(&tx, count);
            session.commit(&tx)
        }
        Err(err) => rejected(err),
    }
}

fn handle_sell(session: &mut CliSession, args: &[String]) -> i32 {
    let (Some(name), Some(count)) = (args.get(2), parse_count_arg(args.get(3))) else {
        eprintln!("usage: upgrade_ledger sell <upgrade> [count]");
        return 2;
    };
    match session.ledger.sell(name, count) {
        Ok(tx) => {
            report_clamped(&tx, count);
            session.commit(&tx)
        }
        Err(err) => rejected(err),
    }
}

/// Batches stop at level 0 or `max_level`; say so when fewer levels moved than asked for.
fn report_clamped(tx: &Transaction, requested: u32) {
    let moved = tx.levels_changed();
    if moved < requested {
        eprintln!(
            "note: {} moved {moved} of {requested} requested levels (now level {})",
            tx.upgrade, tx.to_level
        );
    }
}

fn handle_set(session: &mut CliSession, args: &[String]) -> i32 {
    let (Some(name), Some(Ok(level))) = (args.get(2), args.get(3).map(|v| v.parse::<i64>()))
    else {
        eprintln!("usage: upgrade_ledger set <upgrade> <level>");
        return 2;
    };
    match session.ledger.set_level(name, level) {
        Ok(tx) => session.commit(&tx),
        Err(err) => rejected(err),
    }
}

fn handle_max(session: &mut CliSession, args: &[String]) -> i32 {
    let Some(name) = args.get(2) else {
        eprintln!("usage: upgrade_ledger max <upgrade>");
        return 2;
    };
    match session.ledger.max_out(name) {
        Ok(tx) => session.commit(&tx),
        Err(err) => rejected(err),
    }
}

fn handle_money(session: &mut CliSession, args: &[String]) -> i32 {
    let Some(Ok(amount)) = args.get(2).map(|v| v.trim().parse::<f64>()) else {
        eprintln!("usage: upgrade_ledger money <amount>");
        return 2;
    };
    session.ledger.set_currency(currency_from_f64(amount));
    let available = session.ledger.available();
    session.commit(&json!({ "available": available }))
}

fn handle_strategy(session: &mut CliSession, args: &[String]) -> i32 {
    let Some(raw) = args.get(2) else {
        eprintln!("usage: upgrade_ledger strategy <dpsPerCost|dps|totalDamage|cost>");
        return 2;
    };
    match raw.parse::<Strategy>() {
        Ok(strategy) => {
            session.ledger.set_strategy(strategy);
            session.commit(&json!({ "strategy": strategy }))
        }
        Err(err) => {
            eprintln!("{err}");
            2
        }
    }
}

fn handle_reset(session: &mut CliSession, _args: &[String]) -> i32 {
    session.ledger.reset_levels();
    let summary = session.ledger.view(&TableQuery::default()).summary;
    session.commit(&summary)
}

fn handle_export(session: &mut CliSession, args: &[String]) -> i32 {
    let payload = match export_json(&session.ledger) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("export failed: {err}");
            return 1;
        }
    };
    let Some(path) = args.get(2) else {
        println!("{payload}");
        return 0;
    };
    match fs::write(path, payload) {
        Ok(()) => emit(&json!({ "exported": path })),
        Err(err) => {
            eprintln!("export failed: {err}");
            1
        }
    }
}

fn handle_import(session: &mut CliSession, args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: upgrade_ledger import <path-to-export.json>");
        return 2;
    };
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("import failed: {err}");
            return 1;
        }
    };
    match import_document(&mut session.ledger, &raw) {
        Ok(report) => session.commit(&report),
        Err(err) => {
            eprintln!("import failed: {err}");
            1
        }
    }
}

fn handle_clear(session: &mut CliSession, _args: &[String]) -> i32 {
    match session.store.clear() {
        Ok(()) => emit(&json!({ "status": "cleared" })),
        Err(err) => {
            eprintln!("clear failed: {err}");
            1
        }
    }
}

/// Missing count means one level; anything that is not a non-negative integer is a usage error.
fn parse_count_arg(raw: Option<&String>) -> Option<u32> {
    match raw {
        None => Some(1),
        Some(value) => value.trim().parse::<u32>().ok(),
    }
}
