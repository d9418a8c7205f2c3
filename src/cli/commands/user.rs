use clap::Subcommand;
use serde_json::json;

use crate::auth::password::hash_password;
use crate::auth::PgUserProvider;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user with a hashed password")]
    Create {
        #[arg(long, help = "Display name")]
        name: String,

        #[arg(long, help = "Login email")]
        email: String,

        #[arg(long, help = "Plaintext password, hashed before storage")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create { name, email, password } => {
            let (database, pool) = super::connect(config).await?;
            let users = PgUserProvider::new(pool);

            let hash = hash_password(&password)?;
            let user = users.create(&name, &email, &hash).await?;
            database.close().await;

            output_success(
                output_format,
                &format!("Created user {} <{}>", user.id, user.email),
                Some(json!({ "user": user })),
            )
        }
    }
}
