//! `coupler team`: Show the configured team.

use std::path::Path;
use coupler_core::TeamRoster;

use super::load_config;

pub fn run(config_path: Option<&Path>, prompt: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let roster = config.team_roster()?;

    if prompt {
        print!("{}", roster.describe_all());
        println!();
        return Ok(());
    }

    print!("{}", render_table(&roster));
    Ok(())
}

fn render_table(roster: &TeamRoster) -> String {
    if roster.is_empty() {
        return "  No team members configured. Add [[team]] entries to your config.\n".into();
    }

    let width = roster.iter().map(|m| m.id.len()).max().unwrap_or(0).max(2);
    let mut out = format!("  {:<width$}  Responsibility\n", "Id");
    for member in roster.iter() {
        let marker = if member.is_default { " (default)" } else { "" };
        out.push_str(&format!(
            "  {:<width$}  {}{marker}\n",
            member.id, member.responsibility
        ));
    }
    if roster.default_handler().is_none() {
        out.push_str("\n  No default member: unmatched requests stay UNKNOWN.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_marks_default() {
        let mut builder = TeamRoster::builder();
        builder
            .register("SALES", "handles sales", false)
            .unwrap()
            .register("TEAM_MANAGER", "makes all management decisions", true)
            .unwrap();
        let table = render_table(&builder.build());

        assert!(table.contains("SALES         handles sales\n"));
        assert!(table.contains("makes all management decisions (default)"));
        assert!(!table.contains("No default member"));
    }

    #[test]
    fn empty_roster_is_explained() {
        let table = render_table(&TeamRoster::builder().build());
        assert!(table.contains("No team members configured"));
    }
}
