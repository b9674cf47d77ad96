use log::{info, warn};

use vote_tally::training::{simulate_training, TrainingConfig, TrainingReport};
use vote_tally::*;

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, CandidateCommand, CategoryCommand, Command};
use crate::recon::store_file::{create_store, open_store};

pub mod config_reader;
pub mod export;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod store_file;

#[derive(Debug, Snafu)]
pub enum ReconError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No readable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Unsupported cell content on line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a csv record"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error rendering JSON"))]
    RenderingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing csv file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Data file {path} is corrupt: {detail}"))]
    CorruptStore { path: String, detail: String },
    #[snafu(display("Data file {path} is in use by another process"))]
    StoreLocked { path: String },
    #[snafu(display("{source}"))]
    Store { source: StoreError },
    #[snafu(display("Voting was closed on {closed_at}"))]
    VotingClosed { closed_at: DateTime<Utc> },
    #[snafu(display("Voter {voter} already voted in category {category}"))]
    AlreadyVoted { voter: String, category: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReconResult<T> = Result<T, ReconError>;

pub fn run(args: &Args) -> ReconResult<()> {
    match &args.command {
        Command::Init { config, force } => run_init(&args.data, config.as_deref(), *force),
        Command::Reconcile {
            input,
            input_type,
            out,
            reference,
            excel_worksheet_name,
        } => run_reconcile(
            &args.data,
            input,
            input_type.as_deref(),
            out.as_deref(),
            reference.as_deref(),
            excel_worksheet_name.as_deref(),
        ),
        Command::Train {
            input,
            input_type,
            epochs,
            batch_size,
            learning_rate,
            framework,
            model_type,
            train_split,
            seed,
            out,
            report,
            excel_worksheet_name,
        } => {
            let defaults = TrainingConfig::default();
            let config = TrainingConfig {
                framework: framework.clone().unwrap_or(defaults.framework),
                model_type: model_type.clone().unwrap_or(defaults.model_type),
                epochs: epochs.unwrap_or(defaults.epochs),
                batch_size: batch_size.unwrap_or(defaults.batch_size),
                learning_rate: learning_rate.unwrap_or(defaults.learning_rate),
                train_split: train_split.unwrap_or(defaults.train_split),
                seed: seed.unwrap_or(defaults.seed),
            };
            run_train(
                &args.data,
                input,
                input_type.as_deref(),
                &config,
                out.as_deref(),
                report.as_deref(),
                excel_worksheet_name.as_deref(),
            )
        }
        Command::Vote {
            voter,
            category,
            candidate,
        } => run_vote(&args.data, voter, category, candidate),
        Command::Voter { id } => run_voter(&args.data, id),
        Command::Stats { json } => run_stats(&args.data, *json),
        Command::Top { category, limit } => run_top(&args.data, category, limit.unwrap_or(3)),
        Command::Export { out, format, top } => {
            run_export(&args.data, out, format.as_deref(), top.unwrap_or(3))
        }
        Command::Candidate(cmd) => run_candidate(&args.data, cmd),
        Command::Category(cmd) => run_category(&args.data, cmd),
        Command::CloseVoting => {
            let mut store = open_store(&args.data)?;
            let at = store.close_voting().context(StoreSnafu)?;
            println!("Voting closed on {}", at.to_rfc3339());
            Ok(())
        }
        Command::ReopenVoting => {
            let mut store = open_store(&args.data)?;
            store.reopen_voting().context(StoreSnafu)?;
            println!("Voting reopened");
            Ok(())
        }
        Command::Reset { confirm } => {
            if !*confirm {
                whatever!("Reset wipes every vote and voter record; pass --confirm to run it");
            }
            let mut store = open_store(&args.data)?;
            store.reset().context(StoreSnafu)?;
            println!("Data file reseeded with the default election");
            Ok(())
        }
    }
}

// ********* Batch commands ***********

fn read_dataset(
    input: &str,
    input_type: Option<&str>,
    worksheet: Option<&str>,
) -> ReconResult<Vec<DatasetRow>> {
    let itype = match input_type {
        Some(x) => x.to_string(),
        None => match input.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => "csv".to_string(),
        },
    };
    match itype.as_str() {
        "csv" => io_csv::read_csv_dataset(input),
        "xlsx" | "excel" => io_excel::read_excel_dataset(input, worksheet),
        x => whatever!("Input type not implemented {:?}", x),
    }
}

fn run_init(data_path: &str, config_path: Option<&str>, force: bool) -> ReconResult<()> {
    if Path::new(data_path).exists() && !force {
        whatever!(
            "Data file {} already exists, pass --force to overwrite it",
            data_path
        );
    }
    let contents = match config_path {
        Some(path) => {
            let config = config_reader::read_election_config(path)?;
            config_reader::contents_from_config(&config)?
        }
        None => StoreContents::seeded(),
    };
    create_store(data_path, contents)?;
    println!("Initialized data file {}", data_path);
    Ok(())
}

fn run_reconcile(
    data_path: &str,
    input: &str,
    input_type: Option<&str>,
    out: Option<&str>,
    reference: Option<&str>,
    worksheet: Option<&str>,
) -> ReconResult<()> {
    let rows = read_dataset(input, input_type, worksheet)?;
    info!(
        "run_reconcile: {} data row(s) in {}",
        rows.len(),
        io_common::simplify_file_name(input)
    );
    let mut store = open_store(data_path)?;
    let summary = run_reconciliation(&rows, &mut store).context(StoreSnafu)?;
    let summary_js = build_summary_js(&summary, None);
    emit_summary(&summary_js, out, reference)
}

fn run_train(
    data_path: &str,
    input: &str,
    input_type: Option<&str>,
    config: &TrainingConfig,
    out: Option<&str>,
    report_out: Option<&str>,
    worksheet: Option<&str>,
) -> ReconResult<()> {
    let rows = read_dataset(input, input_type, worksheet)?;
    let mut store = open_store(data_path)?;
    let summary = run_reconciliation(&rows, &mut store).context(StoreSnafu)?;
    let report = simulate_training(config, rows.len());
    info!(
        "run_train: simulated {} epoch(s) over {} row(s), final accuracy {}",
        config.epochs, report.dataset_rows, report.metrics.accuracy
    );
    let summary_js = build_summary_js(&summary, Some((config, &report)));
    emit_summary(&summary_js, out, None)?;
    if let Some(path) = report_out {
        let dataset_name = io_common::simplify_file_name(input);
        export::write_training_csv(path, &dataset_name, config, &report)?;
        info!("run_train: training report written to {}", path);
    }
    Ok(())
}

/// The JSON rendering of a batch summary, optionally with the fabricated
/// training section. Keys follow the naming of the web application this
/// tool descends from.
fn build_summary_js(
    summary: &BatchSummary,
    training: Option<(&TrainingConfig, &TrainingReport)>,
) -> JSValue {
    let mut by_category: JSMap<String, JSValue> = JSMap::new();
    for (category, count) in &summary.votes_by_category {
        by_category.insert(category.clone(), json!(count));
    }
    let mut js = json!({
        "results": {
            "processedVotes": summary.processed_votes,
            "duplicates": summary.duplicates,
            "errors": summary.errors,
            "errorDetails": summary.error_details,
            "votesByCategory": by_category,
        }
    });
    if let Some((config, report)) = training {
        let history: Vec<JSValue> = report
            .history
            .iter()
            .map(|stat| {
                json!({
                    "epoch": stat.epoch,
                    "loss": stat.loss,
                    "accuracy": stat.accuracy,
                    "valLoss": stat.val_loss,
                    "valAccuracy": stat.val_accuracy,
                })
            })
            .collect();
        js["training"] = json!({
            "framework": config.framework,
            "modelType": config.model_type,
            "epochs": config.epochs,
            "datasetRows": report.dataset_rows,
            "trainingTime": report.training_time,
            "metrics": {
                "accuracy": report.metrics.accuracy,
                "precision": report.metrics.precision,
                "recall": report.metrics.recall,
                "f1Score": report.metrics.f1_score,
            },
            "history": history,
        });
    }
    js
}

fn read_summary(path: &str) -> ReconResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

fn emit_summary(
    summary_js: &JSValue,
    out: Option<&str>,
    reference: Option<&str>,
) -> ReconResult<()> {
    let pretty_js = serde_json::to_string_pretty(summary_js).context(RenderingJsonSnafu)?;
    match out {
        None | Some("stdout") => println!("{}", pretty_js),
        Some(path) => fs::write(path, &pretty_js).context(WritingFileSnafu { path })?,
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = reference {
        let reference_js = read_summary(reference_path)?;
        let pretty_ref =
            serde_json::to_string_pretty(&reference_js).context(RenderingJsonSnafu)?;
        if pretty_ref != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_ref.as_str(), pretty_js.as_str(), "\n");
            whatever!("Difference detected between computed summary and reference summary");
        }
    }
    Ok(())
}

// ********* Direct voting ***********

fn run_vote(data_path: &str, voter: &str, category: &str, candidate: &str) -> ReconResult<()> {
    let mut store = open_store(data_path)?;
    if let Some(closed_at) = store.voting_closed_at() {
        return VotingClosedSnafu { closed_at }.fail();
    }
    match store.category(category) {
        None => {
            return Err(StoreError::UnknownCategory {
                id: category.to_string(),
            })
            .context(StoreSnafu);
        }
        Some(cat) if !cat.enabled => {
            whatever!("Category {} is disabled and does not accept votes", category)
        }
        Some(_) => {}
    }
    if store.has_voted(voter, category) {
        return AlreadyVotedSnafu { voter, category }.fail();
    }
    let at = store
        .register_vote(voter, category, candidate)
        .context(StoreSnafu)?;
    println!(
        "Vote by {} in {} registered at {}",
        voter,
        category,
        at.to_rfc3339()
    );
    Ok(())
}

fn run_voter(data_path: &str, id: &str) -> ReconResult<()> {
    let store = open_store(data_path)?;
    match store.voter(id) {
        None => println!("No votes on record for {}", id),
        Some(voter) => {
            println!(
                "Voter {} first voted at {}",
                voter.voter_id,
                voter.first_vote_at.to_rfc3339()
            );
            for category_id in &voter.voted_categories {
                let label = store
                    .category(category_id)
                    .map(|c| c.display_name.clone())
                    .unwrap_or_else(|| category_id.clone());
                println!("  - {}", label);
            }
        }
    }
    Ok(())
}

// ********* Reporting commands ***********

fn run_stats(data_path: &str, as_json: bool) -> ReconResult<()> {
    let store = open_store(data_path)?;
    let stats = store.vote_stats();
    if as_json {
        let mut by_category: JSMap<String, JSValue> = JSMap::new();
        for (category, count) in &stats.votes_by_category {
            by_category.insert(category.clone(), json!(count));
        }
        let js = json!({
            "totalVotes": stats.total_votes,
            "totalVoters": stats.total_voters,
            "votesByCategory": by_category,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&js).context(RenderingJsonSnafu)?
        );
    } else {
        println!("Total votes: {}", stats.total_votes);
        println!("Total voters: {}", stats.total_voters);
        for (category, count) in &stats.votes_by_category {
            println!("  {}: {}", category, count);
        }
        if let Some(at) = store.voting_closed_at() {
            println!("Voting closed on {}", at.to_rfc3339());
        }
    }
    Ok(())
}

fn run_top(data_path: &str, category: &str, limit: usize) -> ReconResult<()> {
    let store = open_store(data_path)?;
    if store.category(category).is_none() {
        return Err(StoreError::UnknownCategory {
            id: category.to_string(),
        })
        .context(StoreSnafu);
    }
    for (idx, candidate) in store.top_candidates(category, limit).iter().enumerate() {
        println!(
            "{}. {} ({}) - {} vote(s)",
            idx + 1,
            candidate.name,
            candidate.party,
            candidate.vote_count
        );
    }
    Ok(())
}

fn run_export(data_path: &str, out: &str, format: Option<&str>, top: usize) -> ReconResult<()> {
    let store = open_store(data_path)?;
    match format.unwrap_or("csv") {
        "csv" => export::write_results_csv(out, &store, top),
        "json" => export::write_results_json(out, &store, top),
        x => whatever!("Export format not implemented {:?}", x),
    }
}

// ********* Administration ***********

fn run_candidate(data_path: &str, cmd: &CandidateCommand) -> ReconResult<()> {
    let mut store = open_store(data_path)?;
    match cmd {
        CandidateCommand::Add {
            name,
            party,
            category,
            description,
            image,
            id,
        } => {
            let entry = NewCandidate {
                id: id.clone(),
                description: description.clone(),
                image: image.clone(),
                ..NewCandidate::new(name, party, category)
            };
            let new_id = store.add_candidate(entry).context(StoreSnafu)?;
            println!("Added candidate {}", new_id);
        }
        CandidateCommand::List { category, active } => {
            let listed: Vec<&Candidate> = if *active {
                store.active_candidates(category.as_deref())
            } else {
                match category.as_deref() {
                    Some(cat) => store.candidates_in(cat),
                    None => store.candidates().iter().collect(),
                }
            };
            for candidate in listed {
                let marker = if candidate.enabled { "" } else { " [disabled]" };
                println!(
                    "{}: {} ({}) in {} - {} vote(s){}",
                    candidate.id,
                    candidate.name,
                    candidate.party,
                    candidate.category,
                    candidate.vote_count,
                    marker
                );
            }
        }
        CandidateCommand::Update {
            id,
            name,
            party,
            category,
            description,
            image,
        } => {
            let patch = CandidateUpdate {
                name: name.clone(),
                party: party.clone(),
                category: category.clone(),
                enabled: None,
                description: description.clone(),
                image: image.clone(),
            };
            store.update_candidate(id, patch).context(StoreSnafu)?;
            println!("Updated candidate {}", id);
        }
        CandidateCommand::Enable { id } => {
            let patch = CandidateUpdate {
                enabled: Some(true),
                ..Default::default()
            };
            store.update_candidate(id, patch).context(StoreSnafu)?;
            println!("Enabled candidate {}", id);
        }
        CandidateCommand::Disable { id } => {
            let patch = CandidateUpdate {
                enabled: Some(false),
                ..Default::default()
            };
            store.update_candidate(id, patch).context(StoreSnafu)?;
            println!("Disabled candidate {}", id);
        }
        CandidateCommand::Remove { id } => {
            store.delete_candidate(id).context(StoreSnafu)?;
            println!("Removed candidate {}", id);
        }
    }
    Ok(())
}

fn run_category(data_path: &str, cmd: &CategoryCommand) -> ReconResult<()> {
    let mut store = open_store(data_path)?;
    match cmd {
        CategoryCommand::Add {
            name,
            display_name,
            description,
            id,
            order,
        } => {
            let entry = NewCategory {
                id: id.clone(),
                order: *order,
                description: description.clone(),
                ..NewCategory::new(name, display_name)
            };
            let new_id = store.add_category(entry).context(StoreSnafu)?;
            println!("Added category {}", new_id);
        }
        CategoryCommand::List { active } => {
            let mut listed: Vec<&Category> = store
                .categories()
                .iter()
                .filter(|c| c.enabled || !*active)
                .collect();
            listed.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
            for category in listed {
                let marker = if category.enabled { "" } else { " [disabled]" };
                println!(
                    "{}. {}: {}{}",
                    category.order, category.id, category.display_name, marker
                );
            }
        }
        CategoryCommand::Update {
            id,
            name,
            display_name,
            description,
        } => {
            let patch = CategoryUpdate {
                name: name.clone(),
                display_name: display_name.clone(),
                enabled: None,
                description: description.clone(),
                image: None,
            };
            store.update_category(id, patch).context(StoreSnafu)?;
            println!("Updated category {}", id);
        }
        CategoryCommand::Enable { id } => {
            let patch = CategoryUpdate {
                enabled: Some(true),
                ..Default::default()
            };
            store.update_category(id, patch).context(StoreSnafu)?;
            println!("Enabled category {}", id);
        }
        CategoryCommand::Disable { id } => {
            let patch = CategoryUpdate {
                enabled: Some(false),
                ..Default::default()
            };
            store.update_category(id, patch).context(StoreSnafu)?;
            println!("Disabled category {}", id);
        }
        CategoryCommand::Remove { id } => {
            store.delete_category(id).context(StoreSnafu)?;
            println!("Removed category {}", id);
        }
        CategoryCommand::Reorder { ids } => {
            store.reorder_categories(ids).context(StoreSnafu)?;
            println!("Reordered {} categorie(s)", ids.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_with(data: &str, command: Command) -> Args {
        Args {
            data: data.to_string(),
            verbose: false,
            command,
        }
    }

    fn path_str(path: &PathBuf) -> String {
        path.display().to_string()
    }

    fn init(data: &str) {
        run(&args_with(
            data,
            Command::Init {
                config: None,
                force: false,
            },
        ))
        .unwrap();
    }

    fn vote(data: &str, voter: &str, category: &str, candidate: &str) -> ReconResult<()> {
        run(&args_with(
            data,
            Command::Vote {
                voter: voter.to_string(),
                category: category.to_string(),
                candidate: candidate.to_string(),
            },
        ))
    }

    #[test]
    fn reconcile_a_mixed_csv_batch() {
        let dir = tempfile::tempdir().unwrap();
        let data = path_str(&dir.path().join("tally.json"));
        let input = dir.path().join("votes.csv");
        fs::write(
            &input,
            "dni,categoria,candidato\n\
             1,Presidencial,María González\n\
             1,presidential,María González\n\
             2,xyz,Ana\n",
        )
        .unwrap();
        init(&data);

        let out = path_str(&dir.path().join("summary.json"));
        run(&args_with(
            &data,
            Command::Reconcile {
                input: path_str(&input),
                input_type: None,
                out: Some(out.clone()),
                reference: None,
                excel_worksheet_name: None,
            },
        ))
        .unwrap();

        let summary: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(summary["results"]["processedVotes"], json!(1));
        assert_eq!(summary["results"]["duplicates"], json!(1));
        assert_eq!(summary["results"]["errors"], json!(1));
        assert_eq!(
            summary["results"]["votesByCategory"]["presidential"],
            json!(1)
        );

        let doc: JSValue = serde_json::from_str(&fs::read_to_string(&data).unwrap()).unwrap();
        let candidates = doc["candidates"].as_array().unwrap();
        let pres1 = candidates.iter().find(|c| c["id"] == json!("pres-1")).unwrap();
        assert_eq!(pres1["votes"], json!(1));
        assert_eq!(doc["voters"].as_array().unwrap().len(), 1);
        assert_eq!(doc["votes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn reconcile_checks_a_reference_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("votes.csv");
        fs::write(&input, "dni,categoria,candidato\n1,Distrital,Carmen Vega\n").unwrap();

        let data1 = path_str(&dir.path().join("one.json"));
        init(&data1);
        let out = path_str(&dir.path().join("summary.json"));
        run(&args_with(
            &data1,
            Command::Reconcile {
                input: path_str(&input),
                input_type: None,
                out: Some(out.clone()),
                reference: None,
                excel_worksheet_name: None,
            },
        ))
        .unwrap();

        // The same batch on a fresh store matches the recorded summary.
        let data2 = path_str(&dir.path().join("two.json"));
        init(&data2);
        run(&args_with(
            &data2,
            Command::Reconcile {
                input: path_str(&input),
                input_type: None,
                out: Some(path_str(&dir.path().join("ignored.json"))),
                reference: Some(out.clone()),
                excel_worksheet_name: None,
            },
        ))
        .unwrap();

        // Running it again on the same store makes the row a duplicate, so
        // the reference no longer matches.
        let res = run(&args_with(
            &data2,
            Command::Reconcile {
                input: path_str(&input),
                input_type: None,
                out: Some(path_str(&dir.path().join("ignored2.json"))),
                reference: Some(out),
                excel_worksheet_name: None,
            },
        ));
        assert!(matches!(res, Err(ReconError::Whatever { .. })));
    }

    #[test]
    fn direct_votes_respect_the_voting_window() {
        let dir = tempfile::tempdir().unwrap();
        let data = path_str(&dir.path().join("tally.json"));
        init(&data);

        vote(&data, "11111111", "presidential", "pres-1").unwrap();
        let res = vote(&data, "11111111", "presidential", "pres-2");
        assert!(matches!(res, Err(ReconError::AlreadyVoted { .. })));

        run(&args_with(&data, Command::CloseVoting)).unwrap();
        let res = vote(&data, "22222222", "presidential", "pres-1");
        assert!(matches!(res, Err(ReconError::VotingClosed { .. })));

        run(&args_with(&data, Command::ReopenVoting)).unwrap();
        vote(&data, "22222222", "presidential", "pres-1").unwrap();
    }

    #[test]
    fn train_reports_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("votes.csv");
        fs::write(
            &input,
            "dni,categoria,candidato\n1,Congresistas,Patricia Silva\n2,Congresistas,Roberto Díaz\n",
        )
        .unwrap();

        let mut outputs: Vec<String> = Vec::new();
        for name in ["one", "two"] {
            let data = path_str(&dir.path().join(format!("{}.json", name)));
            init(&data);
            let out = path_str(&dir.path().join(format!("{}-summary.json", name)));
            let report = path_str(&dir.path().join(format!("{}-report.csv", name)));
            run(&args_with(
                &data,
                Command::Train {
                    input: path_str(&input),
                    input_type: None,
                    epochs: Some(20),
                    batch_size: None,
                    learning_rate: None,
                    framework: None,
                    model_type: None,
                    train_split: None,
                    seed: Some(7),
                    out: Some(out.clone()),
                    report: Some(report.clone()),
                    excel_worksheet_name: None,
                },
            ))
            .unwrap();
            let report_text = fs::read_to_string(&report).unwrap();
            assert!(report_text.starts_with("REPORTE DE RESULTADOS DEL MODELO"));
            outputs.push(fs::read_to_string(&out).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);

        let summary: JSValue = serde_json::from_str(&outputs[0]).unwrap();
        assert_eq!(summary["results"]["processedVotes"], json!(2));
        assert_eq!(summary["training"]["epochs"], json!(20));
        assert_eq!(
            summary["training"]["history"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let data = path_str(&dir.path().join("tally.json"));
        init(&data);
        let res = run(&args_with(
            &data,
            Command::Init {
                config: None,
                force: false,
            },
        ));
        assert!(matches!(res, Err(ReconError::Whatever { .. })));
        run(&args_with(
            &data,
            Command::Init {
                config: None,
                force: true,
            },
        ))
        .unwrap();
    }

    #[test]
    fn admin_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data = path_str(&dir.path().join("tally.json"));
        init(&data);

        run(&args_with(
            &data,
            Command::Category(CategoryCommand::Add {
                name: "mayor".to_string(),
                display_name: "Alcaldía".to_string(),
                description: None,
                id: Some("mayor".to_string()),
                order: None,
            }),
        ))
        .unwrap();
        run(&args_with(
            &data,
            Command::Candidate(CandidateCommand::Add {
                name: "Elena Ruiz".to_string(),
                party: "Movimiento Cívico".to_string(),
                category: "mayor".to_string(),
                description: None,
                image: None,
                id: Some("may-1".to_string()),
            }),
        ))
        .unwrap();
        // Removal is blocked while the candidate is still registered.
        let res = run(&args_with(
            &data,
            Command::Category(CategoryCommand::Remove {
                id: "mayor".to_string(),
            }),
        ));
        assert!(matches!(
            res,
            Err(ReconError::Store {
                source: StoreError::CategoryInUse { .. }
            })
        ));
        run(&args_with(
            &data,
            Command::Candidate(CandidateCommand::Remove {
                id: "may-1".to_string(),
            }),
        ))
        .unwrap();
        run(&args_with(
            &data,
            Command::Category(CategoryCommand::Remove {
                id: "mayor".to_string(),
            }),
        ))
        .unwrap();

        let doc: JSValue = serde_json::from_str(&fs::read_to_string(&data).unwrap()).unwrap();
        assert_eq!(doc["categories"].as_array().unwrap().len(), 3);
        assert_eq!(doc["candidates"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn reset_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let data = path_str(&dir.path().join("tally.json"));
        init(&data);
        vote(&data, "11111111", "district", "dist-1").unwrap();

        let res = run(&args_with(&data, Command::Reset { confirm: false }));
        assert!(matches!(res, Err(ReconError::Whatever { .. })));
        run(&args_with(&data, Command::Reset { confirm: true })).unwrap();

        let doc: JSValue = serde_json::from_str(&fs::read_to_string(&data).unwrap()).unwrap();
        assert_eq!(doc["votes"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn summary_json_uses_camel_case_keys() {
        let summary = BatchSummary {
            processed_votes: 2,
            duplicates: 1,
            errors: 1,
            error_details: vec!["row 4: unknown category 'xyz'".to_string()],
            votes_by_category: vec![
                ("presidential".to_string(), 2),
                ("congress".to_string(), 0),
                ("district".to_string(), 0),
            ],
        };
        let js = build_summary_js(&summary, None);
        assert_eq!(js["results"]["processedVotes"], json!(2));
        assert_eq!(js["results"]["errorDetails"][0], json!("row 4: unknown category 'xyz'"));
        assert_eq!(js["results"]["votesByCategory"]["congress"], json!(0));
        assert!(js.get("training").is_none());
    }
}
