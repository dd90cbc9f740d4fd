//! `coupler split`: Show the atomic requests of a composite request.

use std::path::Path;

use super::{build_coupler, load_config, read_request};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let request = read_request(message)?;
    let coupler = build_coupler(&config, None)?;

    let requests = coupler.split(&request).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&requests)?);
    } else {
        for (i, request) in requests.iter().enumerate() {
            println!("{}. {request}", i + 1);
        }
    }
    Ok(())
}
