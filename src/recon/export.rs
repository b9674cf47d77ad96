//! Exports of the election results and of the simulated training report.

use log::debug;

use std::io::Write;

use crate::recon::*;

fn text_writer(out: &str) -> ReconResult<Box<dyn Write>> {
    match out {
        "stdout" => Ok(Box::new(std::io::stdout())),
        path => {
            let file = fs::File::create(path).context(WritingFileSnafu { path })?;
            Ok(Box::new(file))
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64) / (total as f64) * 100.0
}

/// Share of cast votes over the votes every known voter could still cast,
/// one per category.
fn participation(stats: &VoteStats) -> f64 {
    let races = stats.votes_by_category.len() as u64;
    if stats.total_voters == 0 || races == 0 {
        return 0.0;
    }
    (stats.total_votes as f64) / ((stats.total_voters * races) as f64) * 100.0
}

// ********* Election results ***********

pub fn write_results_csv(out: &str, store: &TallyStore, top: usize) -> ReconResult<()> {
    debug!("write_results_csv: writing election report to {}", out);
    let writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(text_writer(out)?);
    results_records(writer, store, top).context(WritingCsvSnafu { path: out })
}

fn results_records<W: Write>(
    mut writer: csv::Writer<W>,
    store: &TallyStore,
    top: usize,
) -> Result<(), csv::Error> {
    let stats = store.vote_stats();
    writer.write_record(["RESULTADOS FINALES"])?;
    let voters = stats.total_voters.to_string();
    let votes = stats.total_votes.to_string();
    let turnout = format!("{:.1}%", participation(&stats));
    writer.write_record(["Total Votantes", voters.as_str()])?;
    writer.write_record(["Total Votos", votes.as_str()])?;
    writer.write_record(["Participación", turnout.as_str()])?;

    for category in store.active_categories() {
        let total = stats
            .votes_by_category
            .iter()
            .find(|(id, _)| id == &category.id)
            .map(|(_, count)| *count)
            .unwrap_or(0);
        writer.write_record([category.display_name.as_str()])?;
        let ranked = store.top_candidates(&category.id, top);
        match ranked.first() {
            None => {
                writer.write_record(["No hay candidatos en esta categoría"])?;
                continue;
            }
            Some(winner) => {
                let votes = winner.vote_count.to_string();
                let pct = format!("{:.1}%", percentage(winner.vote_count, total));
                writer.write_record([
                    "Ganador",
                    winner.name.as_str(),
                    winner.party.as_str(),
                    votes.as_str(),
                    pct.as_str(),
                ])?;
            }
        }
        writer.write_record(["Pos.", "Candidato", "Partido", "Votos", "%"])?;
        for (idx, candidate) in ranked.iter().enumerate() {
            let position = format!("{}º", idx + 1);
            let votes = candidate.vote_count.to_string();
            let pct = format!("{:.1}%", percentage(candidate.vote_count, total));
            writer.write_record([
                position.as_str(),
                candidate.name.as_str(),
                candidate.party.as_str(),
                votes.as_str(),
                pct.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_results_json(out: &str, store: &TallyStore, top: usize) -> ReconResult<()> {
    debug!("write_results_json: writing election report to {}", out);
    let js = results_js(store, top);
    let pretty = serde_json::to_string_pretty(&js).context(RenderingJsonSnafu)?;
    match out {
        "stdout" => println!("{}", pretty),
        path => fs::write(path, &pretty).context(WritingFileSnafu { path })?,
    }
    Ok(())
}

fn results_js(store: &TallyStore, top: usize) -> JSValue {
    let stats = store.vote_stats();
    let categories: Vec<JSValue> = store
        .active_categories()
        .iter()
        .map(|category| {
            let total = stats
                .votes_by_category
                .iter()
                .find(|(id, _)| id == &category.id)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            let candidates: Vec<JSValue> = store
                .top_candidates(&category.id, top)
                .iter()
                .map(|candidate| {
                    json!({
                        "id": candidate.id,
                        "name": candidate.name,
                        "party": candidate.party,
                        "votes": candidate.vote_count,
                        "percentage": round1(percentage(candidate.vote_count, total)),
                    })
                })
                .collect();
            json!({
                "id": category.id,
                "displayName": category.display_name,
                "totalVotes": total,
                "candidates": candidates,
            })
        })
        .collect();
    let mut js = json!({
        "generatedAt": Utc::now().to_rfc3339(),
        "totalVoters": stats.total_voters,
        "totalVotes": stats.total_votes,
        "participation": round1(participation(&stats)),
        "categories": categories,
    });
    if let Some(at) = store.voting_closed_at() {
        js["votingClosedDate"] = json!(at.to_rfc3339());
    }
    js
}

// ********* Training report ***********

/// The training report, laid out the way the web application exported it:
/// three titled sections separated by blank lines, not a uniform table.
pub fn write_training_csv(
    out: &str,
    dataset_name: &str,
    config: &TrainingConfig,
    report: &TrainingReport,
) -> ReconResult<()> {
    let mut content = String::from("REPORTE DE RESULTADOS DEL MODELO\n\n");
    content.push_str("INFORMACIÓN DEL MODELO\n");
    content.push_str(&format!("Framework,{}\n", framework_name(&config.framework)));
    content.push_str(&format!("Algoritmo,{}\n", model_name(&config.model_type)));
    content.push_str(&format!("Dataset,{}\n", dataset_name));
    content.push_str(&format!("Tamaño del dataset,{} filas\n", report.dataset_rows));
    content.push_str(&format!("Tiempo de entrenamiento,{}\n", report.training_time));
    content.push_str(&format!("Épocas,{}\n", config.epochs));
    content.push_str(&format!("Batch Size,{}\n", config.batch_size));
    content.push_str(&format!("Learning Rate,{}\n", config.learning_rate));
    content.push_str(&format!(
        "Train/Test Split,{}% / {}%\n\n",
        config.train_split,
        100u32.saturating_sub(config.train_split)
    ));
    content.push_str("MÉTRICAS PRINCIPALES\n");
    content.push_str("Métrica,Valor\n");
    content.push_str(&format!("Accuracy,{}%\n", report.metrics.accuracy));
    content.push_str(&format!("Precision,{}%\n", report.metrics.precision));
    content.push_str(&format!("Recall,{}%\n", report.metrics.recall));
    content.push_str(&format!("F1 Score,{}%\n\n", report.metrics.f1_score));
    content.push_str("HISTORIAL DE ENTRENAMIENTO\n");
    content.push_str("Época,Loss,Accuracy,Val Loss,Val Accuracy\n");
    for stat in &report.history {
        content.push_str(&format!(
            "{},{:.4},{:.2}%,{:.4},{:.2}%\n",
            stat.epoch, stat.loss, stat.accuracy, stat.val_loss, stat.val_accuracy
        ));
    }
    match out {
        "stdout" => print!("{}", content),
        path => fs::write(path, &content).context(WritingFileSnafu { path })?,
    }
    Ok(())
}

fn framework_name(framework: &str) -> &str {
    match framework {
        "sklearn" => "Scikit-learn",
        "pytorch" => "PyTorch",
        "tensorflow" => "TensorFlow",
        other => other,
    }
}

fn model_name(model_type: &str) -> &str {
    match model_type {
        "random_forest" => "Random Forest",
        "svm" => "Support Vector Machine",
        "logistic" => "Logistic Regression",
        "gradient_boost" => "Gradient Boosting",
        "mlp" => "Multi-Layer Perceptron",
        "cnn" => "Convolutional Neural Network",
        "rnn" => "Recurrent Neural Network",
        "transformer" => "Transformer",
        "sequential" => "Sequential Model",
        "functional" => "Functional API",
        "keras" => "Keras Model",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vote_tally::training::{EpochStat, TrainingMetrics};

    #[test]
    fn the_election_report_ranks_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results.csv");
        let mut store = TallyStore::in_memory();
        store.register_vote("1", "presidential", "pres-2").unwrap();
        store.register_vote("2", "presidential", "pres-2").unwrap();
        store.register_vote("3", "presidential", "pres-1").unwrap();

        write_results_csv(&out.display().to_string(), &store, 3).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("RESULTADOS FINALES\n"));
        assert!(text.contains("Total Votantes,3\n"));
        assert!(text.contains("Participación,33.3%\n"));
        assert!(text.contains("Ganador,Carlos Ramírez,Alianza Nacional,2,66.7%\n"));
        assert!(text.contains("1º,Carlos Ramírez,Alianza Nacional,2,66.7%\n"));
        assert!(text.contains("2º,María González,Partido Progreso,1,33.3%\n"));
    }

    #[test]
    fn the_json_report_uses_camel_case_keys() {
        let mut store = TallyStore::in_memory();
        store.register_vote("1", "district", "dist-3").unwrap();
        store.close_voting().unwrap();

        let js = results_js(&store, 2);
        assert_eq!(js["totalVoters"], json!(1));
        assert_eq!(js["totalVotes"], json!(1));
        assert_eq!(js["categories"][2]["id"], json!("district"));
        assert_eq!(js["categories"][2]["totalVotes"], json!(1));
        assert_eq!(
            js["categories"][2]["candidates"][0]["name"],
            json!("Sandra López")
        );
        assert_eq!(js["categories"][2]["candidates"][0]["percentage"], json!(100.0));
        assert!(js["votingClosedDate"].is_string());
    }

    #[test]
    fn the_training_report_matches_the_expected_layout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.csv");
        let config = TrainingConfig::default();
        let report = TrainingReport {
            metrics: TrainingMetrics {
                accuracy: 94.5,
                precision: 92.5,
                recall: 91.5,
                f1_score: 92.0,
            },
            history: vec![EpochStat {
                epoch: 10,
                loss: 0.3456,
                accuracy: 88.12,
                val_loss: 0.4,
                val_accuracy: 86.0,
            }],
            training_time: "0m 50s".to_string(),
            dataset_rows: 100,
        };

        write_training_csv(&out.display().to_string(), "votes.csv", &config, &report).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let expected = "REPORTE DE RESULTADOS DEL MODELO\n\
                        \n\
                        INFORMACIÓN DEL MODELO\n\
                        Framework,Scikit-learn\n\
                        Algoritmo,Random Forest\n\
                        Dataset,votes.csv\n\
                        Tamaño del dataset,100 filas\n\
                        Tiempo de entrenamiento,0m 50s\n\
                        Épocas,50\n\
                        Batch Size,32\n\
                        Learning Rate,0.001\n\
                        Train/Test Split,80% / 20%\n\
                        \n\
                        MÉTRICAS PRINCIPALES\n\
                        Métrica,Valor\n\
                        Accuracy,94.5%\n\
                        Precision,92.5%\n\
                        Recall,91.5%\n\
                        F1 Score,92%\n\
                        \n\
                        HISTORIAL DE ENTRENAMIENTO\n\
                        Época,Loss,Accuracy,Val Loss,Val Accuracy\n\
                        10,0.3456,88.12%,0.4000,86.00%\n";
        assert_eq!(text, expected);
    }
}
