use clap::Subcommand;
use serde_json::json;

use crate::auth::{PageRequest, PgTokenStore, PgUserProvider, TokenStore};
use crate::cli::utils::{find_user, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "List a user's tokens, newest first")]
    List {
        #[arg(long, help = "User id or email")]
        user: String,
    },

    #[command(about = "Revoke a user's tokens")]
    Revoke {
        #[arg(long, help = "User id or email")]
        user: String,

        #[arg(long, help = "Token id to keep")]
        except: Option<i64>,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let (database, pool) = super::connect(config).await?;
    let users = PgUserProvider::new(pool.clone());
    let tokens = PgTokenStore::new(pool);
    let provider = config.auth.provider.as_str();

    let result = match cmd {
        TokenCommands::List { user } => {
            let user = find_user(&users, &user).await?;
            let auth_id = user.auth_identifier();
            let total = tokens.count_for(provider, &auth_id).await?;
            let rows = tokens
                .list_for(provider, &auth_id, PageRequest::new(1, total.max(1)))
                .await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "tokens": rows }))?);
                }
                OutputFormat::Text => {
                    println!("{:<10} {:<12} {:<20} {}", "ID", "PROVIDER", "CREATED", "UPDATED");
                    println!("{}", "-".repeat(64));
                    for row in &rows {
                        println!(
                            "{:<10} {:<12} {:<20} {}",
                            row.id,
                            row.provider,
                            row.created_at.format("%Y-%m-%d %H:%M"),
                            row.updated_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
        TokenCommands::Revoke { user, except } => {
            let user = find_user(&users, &user).await?;
            let revoked = tokens
                .delete_for(provider, &user.auth_identifier(), except)
                .await?;
            output_success(
                output_format,
                &format!("Revoked {} token(s) for user {}", revoked, user.id),
                Some(json!({ "revoked": revoked })),
            )
        }
    };

    database.close().await;
    result
}
