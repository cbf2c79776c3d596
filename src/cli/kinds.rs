//! Kinds command implementation

use anyhow::Result;
use serde::Serialize;

use jetctl::StepKind;

#[derive(Serialize)]
struct KindInfo {
    kind: StepKind,
    name: &'static str,
    needs_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
}

/// List every step kind a sequence may use
pub fn kinds_command(json: bool) -> Result<()> {
    let kinds: Vec<KindInfo> = StepKind::ALL
        .iter()
        .map(|&kind| {
            let info = kind.info();
            KindInfo {
                kind,
                name: info.display_name,
                needs_value: info.needs_value,
                unit: info.unit,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&kinds)?);
        return Ok(());
    }

    println!("Step kinds ({}):\n", kinds.len());
    for kind in &kinds {
        let value = match (kind.needs_value, kind.unit) {
            (true, Some(unit)) => format!("<value> {}", unit),
            (true, None) => "<value>".to_string(),
            (false, _) => String::new(),
        };
        println!("  {:<26} {:<24} {}", kind.kind.as_str(), kind.name, value);
    }

    Ok(())
}
