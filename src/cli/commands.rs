use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use crate::board::{BoardView, DragSession};
use crate::cli::error::{parse_stage_arg, user_error, validate_negotiation_id};
use crate::cli::output::{format_board, format_history, format_stages, BoardRenderOptions};
use crate::config::Config;
use crate::db::DbConnection;
use crate::directory::{DirectoryError, SqliteDirectory};
use crate::models::NewNegotiation;
use crate::store::{BoardClient, BoardEvent, MoveOutcome, StoreError};
use crate::utils::{now_ts, parse_price};

#[derive(Parser)]
#[command(name = "negocia")]
#[command(about = "Negocia - sales pipeline board for real-estate negotiations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show every stage with its negotiations
    Board {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Move a negotiation to another stage
    Move {
        /// Negotiation ID
        id: String,
        /// Target stage (wire code or label, e.g. QUALIFICADO or "visita agendada")
        stage: String,
        /// Position hint within the target stage
        #[arg(long = "order", allow_hyphen_values = true)]
        order: Option<i64>,
    },
    /// Create a negotiation for a new lead
    Add {
        /// Lead name
        #[arg(required = true)]
        args: Vec<String>,
        /// Lead phone number
        #[arg(long)]
        phone: Option<String>,
        /// Title of the linked property
        #[arg(long)]
        property: Option<String>,
        /// Property price (e.g. 450000, 450000.50 or 450.000,50)
        #[arg(long)]
        price: Option<String>,
        /// Starting stage (defaults to NOVO_LEAD)
        #[arg(long)]
        stage: Option<String>,
        /// Position hint within the stage
        #[arg(long = "order", allow_hyphen_values = true)]
        order: Option<i64>,
    },
    /// Show the stage transitions of a negotiation
    History {
        /// Negotiation ID
        id: String,
    },
    /// List pipeline stages in order
    Stages,
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are printed by clap and exit 0; usage errors exit 1
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            std::process::exit(code);
        }
    };
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Board { json } => handle_board(json),
        Commands::Move { id, stage, order } => handle_move(id, stage, order),
        Commands::Add { args, phone, property, price, stage, order } => {
            handle_add(args, phone, property, price, stage, order)
        }
        Commands::History { id } => handle_history(id),
        Commands::Stages => {
            print!("{}", format_stages());
            Ok(())
        }
    }
}

/// Load config, open the database and load the board
fn open_board(config: &Config) -> Result<BoardClient<SqliteDirectory>> {
    let conn = DbConnection::connect(config)?;
    let mut client = BoardClient::new(SqliteDirectory::new(conn));
    client.load_all().context("Failed to load board")?;
    Ok(client)
}

fn log_events(events: &std::sync::mpsc::Receiver<BoardEvent>) {
    for event in events.try_iter() {
        if event.is_failure() {
            log::warn!("board event: {:?}", event);
        } else {
            log::debug!("board event: {:?}", event);
        }
    }
}

fn handle_board(json: bool) -> Result<()> {
    let config = Config::load()?;
    let client = open_board(&config)?;
    let view = BoardView::project(client.state(), now_ts(), None);

    if json {
        let out = serde_json::to_string_pretty(&view).context("Failed to serialize board")?;
        println!("{}", out);
    } else {
        let options = BoardRenderOptions::detect(config.color);
        println!("{}", format_board(&view, &options));
    }
    Ok(())
}

fn handle_move(id_str: String, stage_str: String, order: Option<i64>) -> Result<()> {
    let id = match validate_negotiation_id(&id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };
    let target = match parse_stage_arg(&stage_str) {
        Ok(stage) => stage,
        Err(e) => user_error(&e),
    };

    let config = Config::load()?;
    let mut client = open_board(&config)?;
    let events = client.subscribe();

    if client.state().find(id).is_none() {
        user_error(&format!("Negotiation {} not found", id));
    }

    let mut session = DragSession::new();
    session.begin(id)?;
    session.hover(target)?;
    let outcome = client.drop_card(&mut session, target, order)?;
    log_events(&events);

    match outcome {
        MoveOutcome::Confirmed => {
            println!("Moved negotiation {} to {}.", id, target.label());
            Ok(())
        }
        MoveOutcome::Skipped => {
            println!("Negotiation {} is already in {}.", id, target.label());
            Ok(())
        }
        MoveOutcome::RolledBack(error) => {
            user_error(&format!("Could not move negotiation {}: {}. Board restored.", id, error))
        }
        MoveOutcome::NotPending => {
            anyhow::bail!("Move of negotiation {} finished without a pending entry", id)
        }
    }
}

fn handle_add(
    args: Vec<String>,
    phone: Option<String>,
    property: Option<String>,
    price: Option<String>,
    stage: Option<String>,
    order: Option<i64>,
) -> Result<()> {
    let lead_name = args.join(" ");
    if lead_name.trim().is_empty() {
        user_error("Lead name cannot be empty");
    }

    let property_price_cents = match price.as_deref().map(parse_price).transpose() {
        Ok(cents) => cents,
        Err(e) => user_error(&e.to_string()),
    };
    let stage = match stage.as_deref().map(parse_stage_arg).transpose() {
        Ok(stage) => stage,
        Err(e) => user_error(&e),
    };

    let fields = NewNegotiation {
        lead_name,
        lead_phone: phone,
        property_title: property,
        property_price_cents,
        stage,
        order_hint: order,
    };

    let config = Config::load()?;
    let mut client = open_board(&config)?;

    match client.create(&fields) {
        Ok(record) => {
            println!("Created negotiation {} in {}.", record.id, record.stage.label());
            Ok(())
        }
        Err(StoreError::Directory(DirectoryError::Validation(msg))) => {
            user_error(&format!("Cannot create negotiation: {}", msg))
        }
        Err(e) => Err(e).context("Failed to create negotiation"),
    }
}

fn handle_history(id_str: String) -> Result<()> {
    let id = match validate_negotiation_id(&id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };

    let config = Config::load()?;
    let conn = DbConnection::connect(&config)?;
    let directory = SqliteDirectory::new(conn);

    if directory.get(id)?.is_none() {
        user_error(&format!("Negotiation {} not found", id));
    }
    let transitions = directory.history(id)?;
    print!("{}", format_history(id, &transitions));
    Ok(())
}
