mod config;
mod household_cmds;
mod plan_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use config::SousConfig;

#[derive(Parser)]
#[command(name = "sous", about = "Household meal planning under conflicting dietary constraints")]
struct Cli {
    /// Snapshot file path (overrides SOUS_SNAPSHOT env var)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sous config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Household profile management
    Household {
        #[command(subcommand)]
        command: HouseholdCommands,
    },
    /// Plan generation and inspection
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Analyze the most recent plan (cooking time, ingredient reuse)
    Optimize {
        /// Household ID to analyze
        household_id: String,
    },
    /// Aggregate the most recent plan into a shopping list
    Grocery {
        /// Household ID to shop for
        household_id: String,
    },
    /// Show the compacted long-term memory for a household
    Memory {
        /// Household ID to inspect
        household_id: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum HouseholdCommands {
    /// Create a household profile
    Create {
        /// Unique household ID (e.g. "smith")
        id: String,
        /// Cooking time budget per day, in minutes
        #[arg(long, default_value_t = 45)]
        cooking_time_max: u32,
        /// Available appliance (repeatable)
        #[arg(long)]
        appliance: Vec<String>,
        /// Weekly grocery budget
        #[arg(long)]
        budget: Option<f64>,
        /// Preferred cuisine (repeatable)
        #[arg(long)]
        cuisine: Vec<String>,
    },
    /// Add a member to a household
    AddMember {
        /// Household ID
        household_id: String,
        /// Member name
        name: String,
        /// Allergen to avoid (repeatable)
        #[arg(long)]
        allergen: Vec<String>,
        /// Dietary restriction, e.g. vegetarian, gluten-free (repeatable)
        #[arg(long)]
        restriction: Vec<String>,
        /// Health condition, e.g. diabetes (repeatable)
        #[arg(long)]
        condition: Vec<String>,
        /// Disliked ingredient (repeatable)
        #[arg(long)]
        dislike: Vec<String>,
        /// Daily calorie target
        #[arg(long)]
        calorie_target: Option<u32>,
    },
    /// Show a household profile
    Show {
        /// Household ID
        id: String,
    },
    /// List all household IDs
    List,
    /// Remove a household profile
    Remove {
        /// Household ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate a meal plan
    Generate {
        /// Household ID to plan for
        household_id: String,
        /// Plan horizon in days (default from config)
        #[arg(long)]
        days: Option<u32>,
        /// All-or-nothing: fail if any slot exhausts its retries
        #[arg(long)]
        strict: bool,
        /// Synthesis backend: template or openai (default from config)
        #[arg(long)]
        backend: Option<String>,
        /// Seed for reproducible generation (random by default)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the most recently generated plan
    Show {
        /// Household ID
        household_id: String,
    },
}

/// Execute `sous init`: write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    config::save_config(&config::ConfigFile::default())?;

    println!("Config written to {}", path.display());
    println!("  synthesis.backend = template");
    println!();
    println!("Next: create a household with `sous household create <id>`.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Household { command } => {
            let resolved = SousConfig::resolve(cli.snapshot.as_deref())?;
            household_cmds::run_household_command(command, &resolved)?;
        }
        Commands::Plan { command } => {
            let resolved = SousConfig::resolve(cli.snapshot.as_deref())?;
            match command {
                PlanCommands::Generate {
                    household_id,
                    days,
                    strict,
                    backend,
                    seed,
                } => {
                    plan_cmds::run_generate(
                        &resolved,
                        plan_cmds::GenerateOptions {
                            household_id,
                            days,
                            strict,
                            backend,
                            seed,
                        },
                    )
                    .await?;
                }
                PlanCommands::Show { household_id } => {
                    plan_cmds::run_show(&resolved, &household_id)?;
                }
            }
        }
        Commands::Optimize { household_id } => {
            let resolved = SousConfig::resolve(cli.snapshot.as_deref())?;
            plan_cmds::run_optimize(&resolved, &household_id)?;
        }
        Commands::Grocery { household_id } => {
            let resolved = SousConfig::resolve(cli.snapshot.as_deref())?;
            plan_cmds::run_grocery(&resolved, &household_id)?;
        }
        Commands::Memory { household_id } => {
            let resolved = SousConfig::resolve(cli.snapshot.as_deref())?;
            plan_cmds::run_memory(&resolved, &household_id)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
