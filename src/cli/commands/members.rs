use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum MemberCommands {
    #[command(about = "List all members")]
    List,

    #[command(about = "Show the member a modification key belongs to")]
    Show {
        #[arg(long, help = "Modification key")]
        key: String,
    },

    #[command(about = "Create a new member")]
    Create {
        #[arg(long, help = "Full name")]
        name: String,

        #[arg(long, help = "Law firm")]
        law_firm: String,

        #[arg(long, help = "Email address")]
        email: String,

        #[arg(long, help = "Country")]
        country: String,

        #[arg(long = "group", short = 'g', required = true, help = "Group name (repeatable)")]
        groups: Vec<String>,

        #[arg(long, help = "Phone number")]
        phone: Option<String>,
    },
}

pub async fn handle(cmd: MemberCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MemberCommands::List => {
            let data = client.get("/api/users").await?;
            let users = data["users"].as_array().cloned().unwrap_or_default();

            if users.is_empty() {
                return output_empty_collection(&output_format, "users", "No members found");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "users": users }))?,
                OutputFormat::Text => {
                    println!("{:<25} {:<30} {:<25} {:<15} {}", "NAME", "EMAIL", "LAW FIRM", "COUNTRY", "GROUPS");
                    println!("{}", "-".repeat(110));
                    for user in &users {
                        println!(
                            "{:<25} {:<30} {:<25} {:<15} {}",
                            field(user, "name"),
                            field(user, "email"),
                            field(user, "lawFirm"),
                            field(user, "country"),
                            joined_groups(user)
                        );
                    }
                }
            }
            Ok(())
        }
        MemberCommands::Show { key } => {
            let data = client.get_with_query("/api/getUserByKey", &[("key", key.as_str())]).await?;
            let user = &data["user"];

            match output_format {
                OutputFormat::Json => output_json(user)?,
                OutputFormat::Text => print_member(user),
            }
            Ok(())
        }
        MemberCommands::Create { name, law_firm, email, country, groups, phone } => {
            let body = json!({
                "name": name,
                "lawFirm": law_firm,
                "email": email,
                "country": country,
                "groups": groups,
                "phone": phone,
            });
            let data = client.post("/api/createUser", &body).await?;

            output_success(
                &output_format,
                &format!("Member '{}' created", field(&data["user"], "email")),
                Some(json!({ "user": data["user"] })),
            )
        }
    }
}

fn print_member(user: &Value) {
    println!("Name:     {}", field(user, "name"));
    println!("Email:    {}", field(user, "email"));
    println!("Law firm: {}", field(user, "lawFirm"));
    println!("Country:  {}", field(user, "country"));
    let phone = field(user, "phone");
    if !phone.is_empty() {
        println!("Phone:    {}", phone);
    }
    println!("Groups:   {}", joined_groups(user));
}
