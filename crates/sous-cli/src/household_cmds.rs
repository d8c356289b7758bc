//! `sous household` commands: create households, add members, inspect and
//! remove profiles.

use anyhow::{Context, Result};

use sous_store::models::{HouseholdSpec, MemberSpec};
use sous_store::snapshot;

use crate::config::SousConfig;
use crate::HouseholdCommands;

/// Run a household subcommand against the snapshot.
pub fn run_household_command(command: HouseholdCommands, config: &SousConfig) -> Result<()> {
    let (mut profiles, mut memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;

    match command {
        HouseholdCommands::Create {
            id,
            cooking_time_max,
            appliance,
            budget,
            cuisine,
        } => {
            profiles.create_household(HouseholdSpec {
                id: id.clone(),
                cooking_time_max_minutes: cooking_time_max,
                appliances: appliance,
                budget_weekly: budget,
                cuisine_preferences: cuisine,
            })?;
            snapshot::save(&config.snapshot_path, &profiles, &memory)?;
            println!("Household {id:?} created.");
        }

        HouseholdCommands::AddMember {
            household_id,
            name,
            allergen,
            restriction,
            condition,
            dislike,
            calorie_target,
        } => {
            // Dislikes also feed the long-term memory so future plans avoid
            // them even after the member profile changes.
            for ingredient in &dislike {
                memory.add_dislike(&household_id, ingredient);
            }
            profiles.add_member(
                &household_id,
                MemberSpec {
                    name: name.clone(),
                    health_conditions: condition,
                    dietary_restrictions: restriction,
                    allergens: allergen,
                    dislikes: dislike,
                    calorie_target,
                },
            )?;
            snapshot::save(&config.snapshot_path, &profiles, &memory)?;
            println!("Member {name:?} added to household {household_id:?}.");
        }

        HouseholdCommands::Show { id } => {
            let profile = profiles.get(&id)?;
            println!("Household: {}", profile.id);
            println!("  Cooking time budget: {} min/day", profile.cooking_time_max_minutes);
            if let Some(budget) = profile.budget_weekly {
                println!("  Weekly budget: ${budget:.2}");
            }
            if !profile.appliances.is_empty() {
                println!("  Appliances: {}", profile.appliances.join(", "));
            }
            if !profile.cuisine_preferences.is_empty() {
                println!("  Cuisines: {}", profile.cuisine_preferences.join(", "));
            }
            println!("  Members ({}):", profile.members.len());
            for member in &profile.members {
                println!("    {}", member.name);
                if !member.allergens.is_empty() {
                    println!("      allergens: {}", member.allergens.join(", "));
                }
                if !member.dietary_restrictions.is_empty() {
                    println!("      restrictions: {}", member.dietary_restrictions.join(", "));
                }
                if !member.health_conditions.is_empty() {
                    println!("      conditions: {}", member.health_conditions.join(", "));
                }
                if let Some(target) = member.calorie_target {
                    println!("      calorie target: {target} kcal/day");
                }
            }
        }

        HouseholdCommands::List => {
            let ids = profiles.list();
            if ids.is_empty() {
                println!("No households yet. Create one with `sous household create <id>`.");
            } else {
                for id in ids {
                    println!("{id}");
                }
            }
        }

        HouseholdCommands::Remove { id } => {
            profiles.remove(&id)?;
            snapshot::save(&config.snapshot_path, &profiles, &memory)?;
            println!("Household {id:?} removed.");
        }
    }

    Ok(())
}
