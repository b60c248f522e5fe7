use clap::{Args, Parser, Subcommand};
use std::{collections::BTreeMap, fs, path::PathBuf};
use time::{Date, UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use payroster::core::db::{
    MemberId, MemberRepository, Millis, NewProject, NewProjectType, ProjectId, ProjectRepository,
    ProjectTypeId, ProjectTypeRepository, ProjectTypeUpdate, ProjectUpdate, RoleId, RoleRepository,
    SqliteStorage, TrackerDb, millis_to_datetime,
};
use payroster::payout::{self, Payout};
use payroster::view::{self, ProjectFilter};
use payroster::{Config, TrackerError};

#[derive(Parser)]
#[command(name = "payroster")]
#[command(about = "Track projects, their staff and payouts")]
struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Path to the data file, overriding the config
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the member roster
    #[command(subcommand)]
    Member(MemberCommand),
    /// Manage project roles
    #[command(subcommand)]
    Role(RoleCommand),
    /// Manage project types and their payout split
    #[command(subcommand)]
    Type(TypeCommand),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Filter projects and total their prices and payouts
    Report(ReportArgs),
    /// Write all data as one JSON document
    Export {
        #[arg(value_name = "FILE", default_value = "data-export.json")]
        path: PathBuf,
    },
    /// Replace all data with a JSON document produced by `export`
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum MemberCommand {
    Add { name: String },
    List,
    Rename { id: MemberId, name: String },
    Delete { id: MemberId },
}

#[derive(Subcommand)]
enum RoleCommand {
    Add { name: String },
    List,
    Rename { id: RoleId, name: String },
    Delete { id: RoleId },
}

#[derive(Subcommand)]
enum TypeCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        /// Payout share as ROLE_ID=PERCENT (repeatable)
        #[arg(long = "share", value_name = "ROLE_ID=PERCENT", value_parser = parse_share)]
        shares: Vec<(RoleId, f64)>,
    },
    List,
    Update {
        id: ProjectTypeId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        /// Replaces the whole payout split when given
        #[arg(long = "share", value_name = "ROLE_ID=PERCENT", value_parser = parse_share)]
        shares: Vec<(RoleId, f64)>,
    },
    Delete { id: ProjectTypeId },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Add {
        #[arg(long)]
        client: String,
        #[arg(long = "type")]
        project_type: ProjectTypeId,
    },
    /// List active projects, or completed ones with --history
    List {
        #[arg(long)]
        history: bool,
    },
    /// Show the payout table of a project
    Show { id: ProjectId },
    Edit {
        id: ProjectId,
        #[arg(long)]
        client: Option<String>,
        /// Empty string clears the notes
        #[arg(long)]
        notes: Option<String>,
    },
    SetType { id: ProjectId, project_type: ProjectTypeId },
    /// Assign a member to a role; omit the member to unassign
    Assign {
        id: ProjectId,
        role: RoleId,
        member: Option<MemberId>,
    },
    /// Mark a project completed (moves it to history)
    Select { id: ProjectId },
    Unselect { id: ProjectId },
    Quantity { id: ProjectId, quantity: u32 },
    Delete { id: ProjectId },
}

#[derive(Args)]
struct ReportArgs {
    /// First creation day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<Date>,
    /// Last creation day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<Date>,
    /// Client name substring
    #[arg(long)]
    client: Option<String>,
    #[arg(long = "type")]
    project_type: Option<ProjectTypeId>,
}

fn parse_share(s: &str) -> Result<(RoleId, f64), String> {
    let (role, percent) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE_ID=PERCENT, got {:?}", s))?;
    let role = role.parse::<RoleId>().map_err(|e| format!("invalid role id {:?}: {}", role, e))?;
    let percent = percent
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid percent {:?}: {}", percent, e))?;
    Ok((role, percent))
}

fn parse_date(s: &str) -> Result<Date, String> {
    let format = time::format_description::parse("[year]-[month]-[day]").map_err(|e| e.to_string())?;
    Date::parse(s, &format).map_err(|e| format!("invalid date {:?}: {}", s, e))
}

fn format_millis(millis: Millis) -> anyhow::Result<String> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    Ok(millis_to_datetime(millis)?.to_offset(offset).format(&Rfc3339)?)
}

fn print_payout_total(label: &str, total: Payout, currency: &str) {
    println!("{:<24} {:>10} {} {:>10} {}", label, total.member, currency, total.fee, currency);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config_path = args.config.clone().or_else(Config::default_path);
    let config = Config::load_or_default(config_path.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Config { save } = args.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        if save {
            let path = config_path.ok_or_else(|| anyhow::anyhow!("No config directory on this platform"))?;
            config.save(&path)?;
            println!("Saved to {:?}", path);
        }
        return Ok(());
    }

    let storage_path = args.db.unwrap_or_else(|| config.storage_path.clone());
    let storage = SqliteStorage::open(&storage_path).await?;
    let db = TrackerDb::open(storage).await?;

    let result = run(&db, args.command, &config).await;
    db.storage().close().await?;
    result
}

async fn run(db: &TrackerDb<SqliteStorage>, command: Command, config: &Config) -> anyhow::Result<()> {
    let currency = config.currency.as_str();
    match command {
        Command::Member(cmd) => match cmd {
            MemberCommand::Add { name } => {
                let member = db.add_member(&name).await?;
                println!("{}", member.id);
            }
            MemberCommand::List => {
                for member in db.get_members().await? {
                    println!("{}  {}", member.id, member.full_name);
                }
            }
            MemberCommand::Rename { id, name } => {
                db.rename_member(id, &name).await?;
            }
            MemberCommand::Delete { id } => {
                let cleared = db.delete_member(id).await?;
                println!("Deleted member; {} role assignment(s) cleared", cleared);
            }
        },
        Command::Role(cmd) => match cmd {
            RoleCommand::Add { name } => {
                let role = db.add_role(&name).await?;
                println!("{}", role.id);
            }
            RoleCommand::List => {
                for role in db.get_roles().await? {
                    let marker = if role.is_active() { "" } else { " (deleted)" };
                    println!("{}  {}{}", role.id, role.name, marker);
                }
            }
            RoleCommand::Rename { id, name } => {
                db.rename_role(id, &name).await?;
            }
            RoleCommand::Delete { id } => db.delete_role(id).await?,
        },
        Command::Type(cmd) => match cmd {
            TypeCommand::Add { title, price, shares } => {
                let project_type = db
                    .add_project_type(&NewProjectType {
                        title,
                        price,
                        payout_percentages: shares.into_iter().collect(),
                    })
                    .await?;
                println!("{}", project_type.id);
            }
            TypeCommand::List => {
                let roles = db.get_roles().await?;
                for project_type in db.get_project_types().await? {
                    let marker = if project_type.is_active() { "" } else { " (deleted)" };
                    println!(
                        "{}  {}  {} {}{}",
                        project_type.id, project_type.title, project_type.price, currency, marker
                    );
                    for (role_id, percent) in &project_type.payout_percentages {
                        let name = roles
                            .iter()
                            .find(|r| r.id == *role_id)
                            .map(|r| r.name.as_str())
                            .unwrap_or(payout::UNASSIGNED_ROLE_LABEL);
                        println!("    {:<24} {}%", name, percent);
                    }
                }
            }
            TypeCommand::Update { id, title, price, shares } => {
                let payout_percentages =
                    (!shares.is_empty()).then(|| shares.into_iter().collect::<BTreeMap<_, _>>());
                db.update_project_type(
                    id,
                    &ProjectTypeUpdate {
                        title,
                        price,
                        payout_percentages,
                    },
                )
                .await?;
            }
            TypeCommand::Delete { id } => db.delete_project_type(id).await?,
        },
        Command::Project(cmd) => run_project(db, cmd, currency).await?,
        Command::Report(report) => {
            let data = db.export_data().await;
            let filter = ProjectFilter {
                client: report.client,
                project_type_id: report.project_type,
                ..Default::default()
            }
            .with_days(report.from, report.to);
            let filtered = view::filtered_view(&data.projects, &data.project_types, &filter);
            for project in &filtered.projects {
                println!(
                    "{}  {:<32} {}",
                    project.id,
                    project.client_full_name,
                    view::price_label(project, &data.project_types, currency)
                );
            }
            let breakdowns = payout::breakdowns(
                filtered.projects.iter().copied(),
                &data.project_types,
                &data.project_roles,
                &data.members,
            );
            println!();
            println!("Projects: {}", filtered.projects.len());
            println!("Total price: {} {}", filtered.total_price, currency);
            print_payout_total("Total payouts / fees", payout::grand_total(&breakdowns), currency);
        }
        Command::Export { path } => {
            let json = db.export_json().await?;
            fs::write(&path, json)?;
            println!("Exported to {:?}", path);
        }
        Command::Import { path } => {
            let text = fs::read_to_string(&path)?;
            let cleared = db.import_json(&text).await?;
            println!("Imported {:?}; {} dangling assignment(s) cleared", path, cleared);
        }
        Command::Config { .. } => unreachable!("handled before the store is opened"),
    }
    Ok(())
}

async fn run_project(
    db: &TrackerDb<SqliteStorage>,
    cmd: ProjectCommand,
    currency: &str,
) -> anyhow::Result<()> {
    match cmd {
        ProjectCommand::Add { client, project_type } => {
            let project = db
                .add_project(&NewProject {
                    client_full_name: client,
                    project_type_id: project_type,
                })
                .await?;
            println!("{}", project.id);
        }
        ProjectCommand::List { history } => {
            let data = db.export_data().await;
            let projects = if history {
                view::history_projects(&data.projects)
            } else {
                view::active_projects(&data.projects)
            };
            for project in &projects {
                let title = data
                    .project_types
                    .iter()
                    .find(|t| t.id == project.project_type_id)
                    .map(|t| t.title.as_str())
                    .unwrap_or(view::MISSING_PRICE_LABEL);
                let completed = match project.selected_timestamp {
                    Some(ts) => format_millis(ts)?,
                    None => String::new(),
                };
                println!(
                    "{}  {:<32} {:<24} {:>6} {:>14}  {}",
                    project.id,
                    project.client_full_name,
                    title,
                    project.effective_quantity(),
                    view::price_label(project, &data.project_types, currency),
                    completed
                );
            }
            println!(
                "Total: {} {}",
                view::total_price(projects.iter().copied(), &data.project_types),
                currency
            );
        }
        ProjectCommand::Show { id } => {
            let data = db.export_data().await;
            let project = data
                .projects
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| TrackerError::not_found("project", id))?;
            let project_type = data.project_types.iter().find(|t| t.id == project.project_type_id);
            println!("Client:  {}", project.client_full_name);
            println!("Created: {}", format_millis(project.creation_date)?);
            println!("Price:   {}", view::price_label(project, &data.project_types, currency));
            if let Some(notes) = &project.notes {
                println!("Notes:   {}", notes);
            }
            println!();
            let breakdown =
                payout::project_breakdown(project, project_type, &data.project_roles, &data.members);
            for row in &breakdown.rows {
                println!(
                    "{:<24} {:<24} {:>10} {} {:>10} {}",
                    row.role_label(),
                    row.member_label(),
                    row.payout.member,
                    currency,
                    row.payout.fee,
                    currency
                );
            }
            print_payout_total("Total", breakdown.total, currency);
        }
        ProjectCommand::Edit { id, client, notes } => {
            db.update_project(
                id,
                &ProjectUpdate {
                    client_full_name: client,
                    notes,
                },
            )
            .await?;
        }
        ProjectCommand::SetType { id, project_type } => {
            db.set_project_type(id, project_type).await?;
        }
        ProjectCommand::Assign { id, role, member } => {
            db.assign_member(id, role, member).await?;
        }
        ProjectCommand::Select { id } => {
            db.set_selected(id, true).await?;
        }
        ProjectCommand::Unselect { id } => {
            db.set_selected(id, false).await?;
        }
        ProjectCommand::Quantity { id, quantity } => {
            db.set_quantity(id, quantity).await?;
        }
        ProjectCommand::Delete { id } => db.delete_project(id).await?,
    }
    Ok(())
}
