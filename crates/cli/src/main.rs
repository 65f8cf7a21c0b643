//! Kissan CLI - operator command line for the Kissan Plus back office

mod rpc;
mod views;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rpc::RpcClient;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tabled::Table;
use views::{rows, ApplicationRow, LocationRow, PaymentRow, ReviewRow, UserRow};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9530";

#[derive(Parser)]
#[command(name = "kissan")]
#[command(about = "Kissan Plus back-office CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "KISSAN_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Session token from `kissan login`
    #[arg(long, env = "KISSAN_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email or mobile and print a session token
    Login {
        /// Email or 10-digit mobile
        identifier: String,

        #[arg(long, env = "KISSAN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in account
    Me,

    /// Change your password
    Passwd {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,
    },

    /// Manage accounts
    #[command(subcommand)]
    Users(UserCommands),

    /// Browse and extend the location hierarchy
    #[command(subcommand)]
    Locations(LocationCommands),

    /// Work with applications
    #[command(subcommand)]
    Apps(AppCommands),

    /// Payments recorded against an application
    #[command(subcommand)]
    Payments(PaymentCommands),

    /// Counters for your role
    Dashboard,

    /// Download a CSV report
    #[command(subcommand)]
    Export(ExportCommands),

    /// Show server status (Admin)
    Status,

    /// Run maintenance operations (Admin)
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List {
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Create an account; the initial password is printed once
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        mobile: String,

        /// ADMIN, ENGINEER, TALATI, KARKOON, CHOWKIDAR or FARMER
        #[arg(long)]
        role: String,

        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: String,

        /// Jurisdiction (or village for farmers)
        #[arg(long)]
        location: Option<String>,
    },

    /// Deactivate an account and revoke its sessions
    Deactivate { id: String },

    /// Regenerate the role + date-of-birth password
    ResetPassword { id: String },
}

#[derive(Subcommand)]
enum LocationCommands {
    /// List children of a location (States when no parent is given)
    List {
        #[arg(long)]
        parent: Option<String>,

        /// STATE, DISTRICT, SUBDISTRICT or VILLAGE
        #[arg(long)]
        level: Option<String>,
    },

    /// Add a location (Admin)
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        level: String,

        #[arg(long)]
        parent: Option<String>,

        #[arg(long)]
        code: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Deny,
}

impl DecisionArg {
    fn wire(self) -> &'static str {
        match self {
            DecisionArg::Approve => "APPROVED",
            DecisionArg::Deny => "DENIED",
        }
    }
}

#[derive(Subcommand)]
enum AppCommands {
    /// List applications in your scope
    List {
        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        village: Option<String>,

        /// Only applications waiting on your role
        #[arg(long)]
        pending: bool,

        #[arg(long, default_value = "50")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show one application with its review chain
    Show { id: String },

    /// Approve or deny at your step of the chain
    Review {
        id: String,

        #[arg(long, value_enum)]
        decision: DecisionArg,

        #[arg(long)]
        remark: Option<String>,

        /// Water rate in paise per hectare (final approval of billable kinds)
        #[arg(long)]
        rate: Option<i64>,

        /// Refuse if the application changed since this version
        #[arg(long)]
        expected_version: Option<i64>,
    },
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Payments and balance for an application
    List { application_id: String },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Applications in your scope
    Applications {
        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Payments in your scope
    Payments {
        #[arg(long)]
        out: PathBuf,

        /// CASH, CHEQUE or ONLINE
        #[arg(long)]
        mode: Option<String>,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
}

/// JSON object from optional fields, skipping the `None`s
fn params<const N: usize>(fields: [(&str, Option<Value>); N]) -> Value {
    let map: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect();
    Value::Object(map)
}

fn upper(value: Option<String>) -> Option<Value> {
    value.map(|v| Value::String(v.to_ascii_uppercase()))
}

fn string(value: Option<String>) -> Option<Value> {
    value.map(Value::String)
}

fn print_table<T: tabled::Tabled>(items: Vec<T>, empty: &str) {
    if items.is_empty() {
        println!("{}", empty.yellow());
    } else {
        println!("{}", Table::new(items));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url.clone(), cli.token.clone());

    match cli.command {
        Commands::Login {
            identifier,
            password,
        } => {
            let result = client
                .call_anonymous(
                    "auth.login.v1",
                    json!({ "identifier": identifier, "password": password }),
                )
                .await?;

            let token = result["token"].as_str().unwrap_or_default();
            let user = &result["user"];
            println!(
                "{}",
                format!(
                    "✓ Logged in as {} ({})",
                    user["full_name"].as_str().unwrap_or_default(),
                    user["role"].as_str().unwrap_or_default()
                )
                .green()
                .bold()
            );
            println!();
            println!("export KISSAN_TOKEN={}", token);

            if result["must_change_password"].as_bool().unwrap_or(false) {
                println!();
                println!(
                    "{}",
                    "Your password was generated. Run `kissan passwd` before anything else."
                        .yellow()
                );
            }
        }

        Commands::Logout => {
            client.call("auth.logout.v1", json!({})).await?;
            println!("{}", "✓ Logged out".green().bold());
        }

        Commands::Me => {
            let user = client.call("auth.me.v1", json!({})).await?;
            print_table(vec![UserRow::from(&user)], "");
            if user["must_change_password"].as_bool().unwrap_or(false) {
                println!("{}", "Password change required".yellow());
            }
        }

        Commands::Passwd { current, new } => {
            client
                .call(
                    "auth.change_password.v1",
                    json!({ "current_password": current, "new_password": new }),
                )
                .await?;
            println!("{}", "✓ Password changed".green().bold());
        }

        Commands::Users(cmd) => users(&client, cmd).await?,
        Commands::Locations(cmd) => locations(&client, cmd).await?,
        Commands::Apps(cmd) => apps(&client, cmd).await?,

        Commands::Payments(PaymentCommands::List { application_id }) => {
            let request = json!({ "application_id": application_id });
            let payments = client.call("payments.list.v1", request.clone()).await?;
            let summary = client.call("payments.summary.v1", request).await?;

            print_table(rows::<PaymentRow>(&payments), "No payments recorded");
            println!();
            println!(
                "  {} {}",
                "Demand:".bold(),
                summary["demand_paise"]
                    .as_i64()
                    .map(views::rupees)
                    .unwrap_or_else(|| "not billable".to_string())
            );
            println!(
                "  {} {}",
                "Paid:".bold(),
                views::rupees(summary["paid_paise"].as_i64().unwrap_or(0))
            );
            println!(
                "  {} {} ({})",
                "Balance:".bold(),
                views::rupees(summary["balance_paise"].as_i64().unwrap_or(0)),
                summary["status"].as_str().unwrap_or_default()
            );
        }

        Commands::Dashboard => {
            let summary = client.call("dashboard.summary.v1", json!({})).await?;
            println!(
                "{}",
                format!("Dashboard ({})", summary["role"].as_str().unwrap_or_default())
                    .cyan()
                    .bold()
            );
            println!();
            println!("{}", Table::new(views::count_rows(&summary["applications_by_status"])));
            println!("{}", Table::new(views::count_rows(&summary["applications_by_kind"])));
            println!("  {} {}", "Pending for me:".bold(), summary["pending_for_me"]);
            println!(
                "  {} {}",
                "Demand (Rs):".bold(),
                views::rupees(summary["total_demand_paise"].as_i64().unwrap_or(0))
            );
            println!(
                "  {} {}",
                "Collected (Rs):".bold(),
                views::rupees(summary["total_collected_paise"].as_i64().unwrap_or(0))
            );
            if summary["users_by_role"].is_object() {
                println!();
                println!("{}", Table::new(views::count_rows(&summary["users_by_role"])));
                println!("{}", Table::new(views::count_rows(&summary["locations_by_level"])));
            }
        }

        Commands::Export(cmd) => export(&client, cmd).await?,

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.call("admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), client.url());
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Users:".bold(), stats["user_count"]);
                    println!("  {} {}", "Applications:".bold(), stats["application_count"]);
                    println!("  {} {}", "Payments:".bold(), stats["payment_count"]);
                    println!("  {} {}", "Sessions:".bold(), stats["session_count"]);
                    println!();
                    println!(
                        "  {} {:.2} MB",
                        "DB Size:".bold(),
                        stats["db_size_mb"].as_f64().unwrap_or(0.0)
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());
            println!();

            let params = json!({ "force_vacuum": force_vacuum });
            match client.call("admin.maintenance.v1", params).await {
                Ok(report) => {
                    println!("  ✓ Maintenance completed");
                    println!();
                    if report["vacuum_run"].as_bool().unwrap_or(false) {
                        println!("  {} VACUUM executed", "✓".green());
                    } else {
                        println!("  ○ VACUUM skipped (not needed)");
                    }
                    println!(
                        "  {} {} expired sessions purged",
                        "✓".green(),
                        report["sessions_purged"]
                    );
                    println!(
                        "  {} {:.2} MB → {:.2} MB",
                        "DB Size:".bold(),
                        report["stats_before"]["db_size_mb"].as_f64().unwrap_or(0.0),
                        report["stats_after"]["db_size_mb"].as_f64().unwrap_or(0.0)
                    );
                }
                Err(e) => {
                    println!("  {} Maintenance failed: {}", "✗".red(), e);
                }
            }
        }
    }

    Ok(())
}

async fn users(client: &RpcClient, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::List { role, location } => {
            let result = client
                .call(
                    "users.list.v1",
                    params([("role", upper(role)), ("location_id", string(location))]),
                )
                .await?;
            print_table(rows::<UserRow>(&result), "No users found");
        }

        UserCommands::Create {
            name,
            email,
            mobile,
            role,
            dob,
            location,
        } => {
            let result = client
                .call(
                    "users.create.v1",
                    params([
                        ("full_name", Some(json!(name))),
                        ("email", Some(json!(email))),
                        ("mobile", Some(json!(mobile))),
                        ("role", upper(Some(role))),
                        ("date_of_birth", Some(json!(dob))),
                        ("location_id", string(location)),
                    ]),
                )
                .await?;

            println!("{}", "✓ User created".green().bold());
            print_table(vec![UserRow::from(&result["user"])], "");
            println!(
                "  {} {}",
                "Initial password:".bold(),
                result["initial_password"].as_str().unwrap_or_default()
            );
        }

        UserCommands::Deactivate { id } => {
            client
                .call("users.set_active.v1", json!({ "id": id, "active": false }))
                .await?;
            println!("{}", format!("✓ User {} deactivated", id).green().bold());
        }

        UserCommands::ResetPassword { id } => {
            let result = client
                .call("users.reset_password.v1", json!({ "id": id }))
                .await?;
            println!("{}", format!("✓ Password reset for {}", id).green().bold());
            println!(
                "  {} {}",
                "New password:".bold(),
                result["initial_password"].as_str().unwrap_or_default()
            );
        }
    }
    Ok(())
}

async fn locations(client: &RpcClient, cmd: LocationCommands) -> Result<()> {
    match cmd {
        LocationCommands::List { parent, level } => {
            let result = client
                .call(
                    "locations.list.v1",
                    params([("parent_id", string(parent)), ("level", upper(level))]),
                )
                .await?;
            print_table(rows::<LocationRow>(&result), "No locations found");
        }

        LocationCommands::Create {
            name,
            level,
            parent,
            code,
        } => {
            let result = client
                .call(
                    "locations.create.v1",
                    params([
                        ("name", Some(json!(name))),
                        ("level", upper(Some(level))),
                        ("parent_id", string(parent)),
                        ("code", string(code)),
                    ]),
                )
                .await?;
            println!("{}", "✓ Location created".green().bold());
            print_table(vec![LocationRow::from(&result)], "");
        }
    }
    Ok(())
}

async fn apps(client: &RpcClient, cmd: AppCommands) -> Result<()> {
    match cmd {
        AppCommands::List {
            kind,
            status,
            village,
            pending,
            limit,
            offset,
        } => {
            let page = client
                .call(
                    "applications.list.v1",
                    params([
                        ("kind", upper(kind)),
                        ("status", upper(status)),
                        ("village_id", string(village)),
                        ("pending_for_me", Some(json!(pending))),
                        ("limit", Some(json!(limit))),
                        ("offset", Some(json!(offset))),
                    ]),
                )
                .await?;

            print_table(rows::<ApplicationRow>(&page["items"]), "No applications found");
            println!(
                "  {} of {} (offset {})",
                page["items"].as_array().map_or(0, |a| a.len()),
                page["total"],
                page["offset"]
            );
        }

        AppCommands::Show { id } => {
            let app = client.call("applications.get.v1", json!({ "id": id })).await?;
            print_table(vec![ApplicationRow::from(&app)], "");
            println!();
            println!("{}", "Review chain".cyan().bold());
            print_table(rows::<ReviewRow>(&app["reviews"]), "No reviewers");
            println!("  {} {}", "Version:".bold(), app["version"]);
        }

        AppCommands::Review {
            id,
            decision,
            remark,
            rate,
            expected_version,
        } => {
            let app = client
                .call(
                    "applications.review.v1",
                    params([
                        ("id", Some(json!(id))),
                        ("decision", Some(json!(decision.wire()))),
                        ("remark", string(remark)),
                        ("rate_per_hectare_paise", rate.map(|r| json!(r))),
                        ("expected_version", expected_version.map(|v| json!(v))),
                    ]),
                )
                .await?;

            println!(
                "{}",
                format!(
                    "✓ {} is now {}",
                    app["reference_no"].as_str().unwrap_or_default(),
                    app["status"].as_str().unwrap_or_default()
                )
                .green()
                .bold()
            );
        }
    }
    Ok(())
}

async fn export(client: &RpcClient, cmd: ExportCommands) -> Result<()> {
    let (method, request, out) = match cmd {
        ExportCommands::Applications { out, kind, status } => (
            "reports.applications.v1",
            params([("kind", upper(kind)), ("status", upper(status))]),
            out,
        ),
        ExportCommands::Payments {
            out,
            mode,
            from,
            to,
        } => (
            "reports.payments.v1",
            params([
                ("mode", upper(mode)),
                ("from", string(from)),
                ("to", string(to)),
            ]),
            out,
        ),
    };

    let report = client.call(method, request).await?;
    let content = report["content"]
        .as_str()
        .context("Report has no content")?;
    std::fs::write(&out, content).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{}",
        format!("✓ {} rows written to {}", report["rows"], out.display())
            .green()
            .bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_skips_missing_fields() {
        let value = params([
            ("role", upper(Some("farmer".to_string()))),
            ("location_id", None),
        ]);
        assert_eq!(value, json!({ "role": "FARMER" }));
    }

    #[test]
    fn test_cli_parses_review() {
        let cli = Cli::try_parse_from([
            "kissan",
            "--token",
            "t-1",
            "apps",
            "review",
            "app-1",
            "--decision",
            "approve",
            "--rate",
            "50000",
        ])
        .unwrap();

        match cli.command {
            Commands::Apps(AppCommands::Review { id, decision, rate, .. }) => {
                assert_eq!(id, "app-1");
                assert_eq!(decision.wire(), "APPROVED");
                assert_eq!(rate, Some(50000));
            }
            _ => panic!("expected apps review"),
        }
    }
}
