use serde_json::{json, Value};

use crate::auth::{PgUserProvider, UserProvider};
use crate::cli::OutputFormat;
use crate::coerce;
use crate::database::User;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Find a user by numeric id or by email
pub async fn find_user(users: &PgUserProvider, reference: &str) -> anyhow::Result<User> {
    let found = if coerce::parse_id(reference, "user").is_ok() {
        users.retrieve_by_id(reference).await?
    } else {
        users.retrieve_by_email(reference).await?
    };
    found.ok_or_else(|| anyhow::anyhow!("user '{}' not found", reference))
}
