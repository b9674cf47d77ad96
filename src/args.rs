use clap::{Parser, Subcommand};

/// This is a vote reconciliation and tally program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON document holding the tally data. Seeded with the default
    /// election on first use; see the init command for seeding from a configuration file.
    #[clap(short, long, value_parser, default_value = "tally.json", global = true)]
    pub data: String,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Creates the data file, seeded with the default election or from a configuration file.
    Init {
        /// (file path, optional) A JSON election description with the categories and candidates
        /// to seed instead of the defaults.
        #[clap(short, long, value_parser)]
        config: Option<String>,
        /// Overwrites an existing data file.
        #[clap(long, takes_value = false)]
        force: bool,
    },
    /// Reconciles a dataset of votes into the tally.
    Reconcile {
        /// (file path) The dataset, one row per vote.
        #[clap(short, long, value_parser)]
        input: String,
        /// (default csv) The type of the input: csv or xlsx.
        #[clap(long, value_parser)]
        input_type: Option<String>,
        /// (file path, 'stdout' or empty) If specified, the summary of the batch will be written
        /// in JSON format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference file containing the expected batch summary in JSON format.
        /// If provided, escrutinio will check that the computed summary matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
        /// (default: first worksheet) When using an Excel file, indicates the name of the
        /// worksheet to use.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Reconciles a dataset, then fabricates training-style metrics over it.
    Train {
        /// (file path) The dataset, one row per vote.
        #[clap(short, long, value_parser)]
        input: String,
        /// (default csv) The type of the input: csv or xlsx.
        #[clap(long, value_parser)]
        input_type: Option<String>,
        /// (default 50) The number of pretend epochs.
        #[clap(long, value_parser)]
        epochs: Option<u32>,
        /// (default 32) The pretend batch size, echoed into the report.
        #[clap(long, value_parser)]
        batch_size: Option<u32>,
        /// (default 0.001) The pretend learning rate, echoed into the report.
        #[clap(long, value_parser)]
        learning_rate: Option<f64>,
        /// (default sklearn) The pretend framework name.
        #[clap(long, value_parser)]
        framework: Option<String>,
        /// (default random_forest) The pretend model type.
        #[clap(long, value_parser)]
        model_type: Option<String>,
        /// (default 80) Training share of the pretend train/test split, in percent.
        #[clap(long, value_parser)]
        train_split: Option<u32>,
        /// (default 42) Seed for the fabricated metrics. Equal seeds reproduce equal reports.
        #[clap(long, value_parser)]
        seed: Option<u64>,
        /// (file path, 'stdout' or empty) If specified, the batch summary and the fabricated
        /// metrics will be written in JSON format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path or 'stdout') If specified, writes the full training report as a CSV document.
        #[clap(long, value_parser)]
        report: Option<String>,
        /// (default: first worksheet) When using an Excel file, indicates the name of the
        /// worksheet to use.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Casts one vote directly.
    Vote {
        /// The voter document number.
        #[clap(long, value_parser)]
        voter: String,
        /// The category id to vote in.
        #[clap(long, value_parser)]
        category: String,
        /// The candidate id to vote for.
        #[clap(long, value_parser)]
        candidate: String,
    },
    /// Shows the voting record of one voter.
    Voter {
        /// The voter document number.
        #[clap(value_parser)]
        id: String,
    },
    /// Prints aggregate statistics of the tally.
    Stats {
        /// Prints the statistics as JSON instead of text.
        #[clap(long, takes_value = false)]
        json: bool,
    },
    /// Prints the leading candidates of one category.
    Top {
        /// The category id.
        #[clap(value_parser)]
        category: String,
        /// (default 3) How many candidates to print.
        #[clap(short, long, value_parser)]
        limit: Option<usize>,
    },
    /// Writes an election results report.
    Export {
        /// (file path or 'stdout') Where to write the report.
        #[clap(short, long, value_parser)]
        out: String,
        /// (default csv) The report format: csv or json.
        #[clap(long, value_parser)]
        format: Option<String>,
        /// (default 3) How many candidates per category in the report.
        #[clap(long, value_parser)]
        top: Option<usize>,
    },
    /// Candidate management.
    #[clap(subcommand)]
    Candidate(CandidateCommand),
    /// Category management.
    #[clap(subcommand)]
    Category(CategoryCommand),
    /// Closes voting: further votes are rejected until voting is reopened.
    CloseVoting,
    /// Reopens voting after a close.
    ReopenVoting,
    /// Wipes the data file and reseeds the default election.
    Reset {
        /// Must be passed for the reset to run.
        #[clap(long, takes_value = false)]
        confirm: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CandidateCommand {
    /// Registers a new candidate.
    Add {
        #[clap(long, value_parser)]
        name: String,
        #[clap(long, value_parser)]
        party: String,
        /// The category id the candidate runs in.
        #[clap(long, value_parser)]
        category: String,
        #[clap(long, value_parser)]
        description: Option<String>,
        /// An opaque image reference, carried through verbatim.
        #[clap(long, value_parser)]
        image: Option<String>,
        /// (optional) An explicit id. Derived from the category when omitted.
        #[clap(long, value_parser)]
        id: Option<String>,
    },
    /// Lists candidates.
    List {
        /// Restricts the listing to one category.
        #[clap(long, value_parser)]
        category: Option<String>,
        /// Lists enabled candidates only.
        #[clap(long, takes_value = false)]
        active: bool,
    },
    /// Updates fields of a candidate.
    Update {
        #[clap(value_parser)]
        id: String,
        #[clap(long, value_parser)]
        name: Option<String>,
        #[clap(long, value_parser)]
        party: Option<String>,
        #[clap(long, value_parser)]
        category: Option<String>,
        #[clap(long, value_parser)]
        description: Option<String>,
        #[clap(long, value_parser)]
        image: Option<String>,
    },
    /// Enables a candidate for voting.
    Enable {
        #[clap(value_parser)]
        id: String,
    },
    /// Disables a candidate. Votes already counted are kept.
    Disable {
        #[clap(value_parser)]
        id: String,
    },
    /// Removes a candidate and every vote cast for it.
    Remove {
        #[clap(value_parser)]
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Registers a new category.
    Add {
        #[clap(long, value_parser)]
        name: String,
        #[clap(long, value_parser)]
        display_name: String,
        #[clap(long, value_parser)]
        description: Option<String>,
        /// (optional) An explicit id.
        #[clap(long, value_parser)]
        id: Option<String>,
        /// (default: appended after the existing categories) The position in listings.
        #[clap(long, value_parser)]
        order: Option<u32>,
    },
    /// Lists categories in display order.
    List {
        /// Lists enabled categories only.
        #[clap(long, takes_value = false)]
        active: bool,
    },
    /// Updates fields of a category.
    Update {
        #[clap(value_parser)]
        id: String,
        #[clap(long, value_parser)]
        name: Option<String>,
        #[clap(long, value_parser)]
        display_name: Option<String>,
        #[clap(long, value_parser)]
        description: Option<String>,
    },
    /// Enables a category.
    Enable {
        #[clap(value_parser)]
        id: String,
    },
    /// Disables a category. It stops being listed as active; votes are kept.
    Disable {
        #[clap(value_parser)]
        id: String,
    },
    /// Removes an empty category. The seeded categories cannot be removed.
    Remove {
        #[clap(value_parser)]
        id: String,
    },
    /// Reassigns the display order to follow the given id sequence.
    Reorder {
        /// The category ids in their new order.
        #[clap(value_parser, required = true)]
        ids: Vec<String>,
    },
}
