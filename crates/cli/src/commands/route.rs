//! `coupler route`: Split a request and route every piece.

use std::path::Path;
use coupler_agent::ClassifiedRequest;
use coupler_core::{Assignment, CouplerError};
use serde::Serialize;

use super::{build_coupler, load_config, read_request};

pub struct RouteOptions {
    pub json: bool,
    pub concurrency: Option<usize>,
    pub isolated: bool,
}

/// JSON shape of one `--isolated` outcome.
#[derive(Serialize)]
struct OutcomeReport<'a> {
    request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignment: Option<&'a Assignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    options: RouteOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let request = read_request(message)?;
    let coupler = build_coupler(&config, options.concurrency)?;

    if options.isolated {
        let outcomes = coupler.process_isolated(&request).await.map_err(explain)?;
        if options.json {
            println!("{}", outcomes_json(&outcomes)?);
        } else {
            for line in outcome_lines(&outcomes) {
                println!("{line}");
            }
        }
        return Ok(());
    }

    let assignments = coupler.process(&request).await.map_err(explain)?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&assignments)?);
    } else {
        for assignment in &assignments {
            println!("{assignment}");
        }
    }
    Ok(())
}

fn outcome_lines(outcomes: &[ClassifiedRequest]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(assignment) => assignment.to_string(),
            Err(e) => format!("{} -- not routed -- {e}", outcome.request),
        })
        .collect()
}

fn outcomes_json(outcomes: &[ClassifiedRequest]) -> Result<String, serde_json::Error> {
    let reports: Vec<OutcomeReport<'_>> = outcomes
        .iter()
        .map(|outcome| OutcomeReport {
            request: &outcome.request,
            assignment: outcome.result.as_ref().ok(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    serde_json::to_string_pretty(&reports)
}

/// Attach a setup hint to configuration errors.
fn explain(err: CouplerError) -> Box<dyn std::error::Error> {
    if err.is_configuration() {
        format!("{err}. Check the [[team]] entries in your config, or run `coupler onboard`.")
            .into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> Vec<ClassifiedRequest> {
        vec![
            ClassifiedRequest {
                request: "Launch a marketing campaign.".into(),
                result: Ok(Assignment {
                    handler_id: "MARKETING".into(),
                    responsibility_echo: "creates marketing materials".into(),
                    source_request: "Launch a marketing campaign.".into(),
                    confidence: 0.9,
                    fallback_applied: false,
                }),
            },
            ClassifiedRequest {
                request: "Hire two new salespeople.".into(),
                result: Err(CouplerError::ModelTimeout { timeout_ms: 60_000 }),
            },
        ]
    }

    #[test]
    fn lines_report_each_outcome() {
        let lines = outcome_lines(&outcomes());
        assert_eq!(lines[0], "Launch a marketing campaign. -- sent to -- MARKETING(0.9)");
        assert!(lines[1].starts_with("Hire two new salespeople. -- not routed -- "));
    }

    #[test]
    fn json_carries_assignment_or_error() {
        let json: serde_json::Value = serde_json::from_str(&outcomes_json(&outcomes()).unwrap()).unwrap();
        assert_eq!(json[0]["assignment"]["handler_id"], "MARKETING");
        assert!(json[0].get("error").is_none());
        assert!(json[1]["error"].as_str().unwrap().contains("60000"));
        assert!(json[1].get("assignment").is_none());
    }

    #[test]
    fn configuration_errors_get_a_hint() {
        assert!(explain(CouplerError::EmptyRegistry).to_string().contains("[[team]]"));
        assert!(!explain(CouplerError::NoRequestsExtracted).to_string().contains("[[team]]"));
    }
}
