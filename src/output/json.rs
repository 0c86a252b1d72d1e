use crate::overview::Overview;
use anyhow::Result;

pub fn print_json(overview: &Overview) -> Result<()> {
    let json = serde_json::to_string_pretty(overview)?;
    println!("{}", json);
    Ok(())
}
