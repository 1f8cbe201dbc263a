use crate::config::Config;
use schemars::schema_for;

/// Print the JSON Schema of `casegen.yaml`
pub fn execute() -> anyhow::Result<()> {
    let mut schema = schema_for!(Config);
    let metadata = schema.schema.metadata();
    metadata.title = Some("casegen.yaml".to_string());
    metadata.description =
        Some("Stage models, review budget and revision limits for `casegen generate`".to_string());

    let json = serde_json::to_string_pretty(&schema)?;
    println!("{}", json);
    Ok(())
}
