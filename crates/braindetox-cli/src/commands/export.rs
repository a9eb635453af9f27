use std::error::Error;
use std::path::PathBuf;

pub fn run(out: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    let exported = svc.export_data()?;
    let json = serde_json::to_string_pretty(&exported)?;
    match out {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
