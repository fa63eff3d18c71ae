use anyhow::Result;

use crate::registry::CATALOG;

/// Execute the `connectors` command: list built-in connectors.
pub fn execute() -> Result<()> {
    for (name, direction, description) in CATALOG {
        println!("  {name}  [{direction}]");
        println!("    {description}");
    }
    Ok(())
}
