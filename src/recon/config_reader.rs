//! Reader for election configuration files, the seed input of `init --config`.

use log::info;

use crate::recon::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCategory {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub enabled: Option<bool>,
    pub order: Option<u32>,
    pub description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    pub id: Option<String>,
    pub name: String,
    pub party: String,
    pub category: String,
    pub enabled: Option<bool>,
    pub description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    pub categories: Option<Vec<ConfigCategory>>,
    pub candidates: Option<Vec<ConfigCandidate>>,
}

pub fn read_election_config(path: &str) -> ReconResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

/// The initial store state described by a configuration. Categories keep
/// their file order unless they carry an explicit `order`; candidate ids
/// default to `{category}-{position}` within their category.
pub fn contents_from_config(config: &ElectionConfig) -> ReconResult<StoreContents> {
    if let Some(settings) = &config.output_settings {
        if let Some(name) = &settings.contest_name {
            info!("contents_from_config: seeding contest {}", name);
        }
    }

    let mut categories: Vec<Category> = Vec::new();
    match &config.categories {
        None => categories = StoreContents::seeded().categories,
        Some(listed) => {
            for (position, entry) in listed.iter().enumerate() {
                if categories.iter().any(|c| c.id == entry.id) {
                    whatever!("Duplicate category id in configuration: {}", entry.id);
                }
                categories.push(Category {
                    id: entry.id.clone(),
                    name: entry.name.clone().unwrap_or_else(|| entry.id.clone()),
                    display_name: entry
                        .display_name
                        .clone()
                        .unwrap_or_else(|| entry.id.clone()),
                    enabled: entry.enabled.unwrap_or(true),
                    order: entry.order.unwrap_or((position + 1) as u32),
                    description: entry.description.clone(),
                    image: None,
                });
            }
        }
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in config.candidates.iter().flatten() {
        if !categories.iter().any(|c| c.id == entry.category) {
            whatever!(
                "Candidate {} references unknown category {}",
                entry.name,
                entry.category
            );
        }
        let id = match &entry.id {
            Some(id) => id.clone(),
            None => {
                let position = candidates
                    .iter()
                    .filter(|c| c.category == entry.category)
                    .count()
                    + 1;
                format!("{}-{}", entry.category, position)
            }
        };
        if candidates.iter().any(|c| c.id == id) {
            whatever!("Duplicate candidate id in configuration: {}", id);
        }
        candidates.push(Candidate {
            id,
            name: entry.name.clone(),
            party: entry.party.clone(),
            category: entry.category.clone(),
            vote_count: 0,
            enabled: entry.enabled.unwrap_or(true),
            description: entry.description.clone(),
            image: None,
        });
    }

    Ok(StoreContents {
        candidates,
        categories,
        voters: Vec::new(),
        votes: Vec::new(),
        voting_closed_at: None,
    })
}
