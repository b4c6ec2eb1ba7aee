use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum GroupCommands {
    #[command(about = "List all groups")]
    List,

    #[command(about = "Create new group")]
    Create {
        #[arg(help = "Group name")]
        name: String,
    },

    #[command(about = "Rename group and update every member that references it")]
    Rename {
        #[arg(help = "Current group name")]
        old_name: String,
        #[arg(help = "New group name")]
        new_name: String,
    },

    #[command(about = "Delete group (refused while members reference it)")]
    Delete {
        #[arg(help = "Group name")]
        name: String,
    },
}

pub async fn handle(cmd: GroupCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        GroupCommands::List => {
            let data = client.get("/api/getGroups").await?;
            let groups = data["groups"].as_array().cloned().unwrap_or_default();

            if groups.is_empty() {
                return output_empty_collection(&output_format, "groups", "No groups defined");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "groups": groups }))?,
                OutputFormat::Text => {
                    for group in groups.iter().filter_map(|g| g.as_str()) {
                        println!("{}", group);
                    }
                }
            }
            Ok(())
        }
        GroupCommands::Create { name } => {
            let data = client.post("/api/groups", &json!({ "name": name })).await?;
            output_success(
                &output_format,
                &format!("Group '{}' created", field(&data["group"], "name")),
                Some(json!({ "group": data["group"] })),
            )
        }
        GroupCommands::Rename { old_name, new_name } => {
            let data = client
                .post("/api/groups/rename", &json!({ "oldName": old_name, "newName": new_name }))
                .await?;
            let updated = data["membersUpdated"].as_u64().unwrap_or(0);
            output_success(
                &output_format,
                &format!("Group '{}' renamed to '{}' ({} member(s) updated)", old_name, new_name, updated),
                Some(json!({ "membersUpdated": updated })),
            )
        }
        GroupCommands::Delete { name } => {
            client.delete(&["api", "groups", &name]).await?;
            output_success(&output_format, &format!("Group '{}' deleted", name), None)
        }
    }
}
