// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use crowdfund_ledger::{BootstrapConfig, Engine, Invocation, SequentialIds};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{Level, error, info, warn};

/// Crowdfund Ledger - Replay an invocation script against a fresh ledger
///
/// Each line is one invocation (`verb,arg,...`) run as its own transaction.
/// Query results are written to stdout as JSON, one per line.
#[derive(Parser, Debug)]
#[command(name = "crowdfund-ledger")]
#[command(about = "Runs crowdfunding invocation scripts against an in-memory ledger", long_about = None)]
struct Args {
    /// Path to the invocation script
    ///
    /// A line may bind the id of the record it creates to a variable with
    /// `name=verb,...`; later lines refer to it as `$name`. Seed accounts are
    /// bound under their display names.
    /// Example: cargo run -- scenario.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON file with seed accounts (defaults to the built-in set)
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.seed {
        Some(path) => match BootstrapConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading seed file '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => BootstrapConfig::default(),
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = Engine::with_ids(Arc::new(SequentialIds::new("")));
    let mut script = match Script::bootstrap(&engine, &config) {
        Ok(script) => script,
        Err(e) => {
            error!("Error seeding accounts: {}", e);
            process::exit(1);
        }
    };

    match script.run(BufReader::new(file), std::io::stdout()) {
        Ok(summary) => info!(
            applied = summary.applied,
            rejected = summary.rejected,
            committed = engine.ledger().commit_log().len(),
            "script finished"
        ),
        Err(e) => {
            error!("Error processing script: {}", e);
            process::exit(1);
        }
    }
}

/// Outcome counts of one script run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub rejected: usize,
}

/// Script interpreter: variable bindings plus the engine they refer into.
pub struct Script<'e> {
    engine: &'e Engine,
    vars: HashMap<String, String>,
}

impl<'e> Script<'e> {
    /// Seeds `config` and binds every seed account's id under its name.
    pub fn bootstrap(
        engine: &'e Engine,
        config: &BootstrapConfig,
    ) -> Result<Self, crowdfund_ledger::LedgerError> {
        let vars = engine
            .bootstrap(config)?
            .into_iter()
            .map(|user| (user.name, user.id.to_string()))
            .collect();
        Ok(Self { engine, vars })
    }

    /// Runs every line of `reader`, writing query payloads to `writer`.
    ///
    /// Rejected invocations are logged and skipped; only I/O and CSV
    /// structure errors stop the run.
    pub fn run<R: Read, W: Write>(&mut self, reader: R, mut writer: W) -> Result<Summary, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .has_headers(false)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut summary = Summary::default();
        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = line + 1, "Skipping malformed row: {}", e);
                    summary.rejected += 1;
                    continue;
                }
            };
            if record.iter().all(str::is_empty) {
                continue;
            }

            let (binding, args) = self.expand(&record);
            let outcome = Invocation::parse(&args).and_then(|invocation| {
                let payload = self.engine.invoke(self.engine.next_tx_id(), &invocation)?;
                Ok((invocation, payload))
            });

            match outcome {
                Ok((invocation, payload)) => {
                    summary.applied += 1;
                    if let Some(name) = binding {
                        self.bind(name, &payload);
                    }
                    if invocation.is_query() {
                        writer.write_all(&payload)?;
                        writer.write_all(b"\n")?;
                    }
                }
                Err(e) => {
                    warn!(line = line + 1, "Skipping invocation: {}", e);
                    summary.rejected += 1;
                }
            }
        }

        writer.flush()?;
        Ok(summary)
    }

    /// Splits an optional `name=` binding off the verb and substitutes `$vars`.
    fn expand(&self, record: &StringRecord) -> (Option<String>, Vec<String>) {
        let mut fields = record.iter();
        let head = fields.next().unwrap_or_default();
        let (binding, verb) = match head.split_once('=') {
            Some((name, verb)) => (Some(name.trim().to_owned()), verb.trim()),
            None => (None, head),
        };

        let args = std::iter::once(verb.to_owned())
            .chain(fields.map(|field| match field.strip_prefix('$') {
                Some(name) => self.vars.get(name).cloned().unwrap_or_else(|| field.to_owned()),
                None => field.to_owned(),
            }))
            .collect();
        (binding, args)
    }

    fn bind(&mut self, name: String, payload: &[u8]) {
        let id = serde_json::from_slice::<serde_json::Value>(payload)
            .ok()
            .and_then(|value| value.get("id").and_then(|id| id.as_str()).map(str::to_owned));
        match id {
            Some(id) => {
                self.vars.insert(name, id);
            }
            None => warn!(variable = %name, "Result has no id to bind"),
        }
    }
}
