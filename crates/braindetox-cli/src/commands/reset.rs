use std::error::Error;

pub fn run(yes: bool) -> Result<(), Box<dyn Error>> {
    if !yes {
        println!("this deletes all usage, limit and puzzle data; pass --yes to confirm");
        return Ok(());
    }
    let svc = super::open_service()?;
    svc.clear_all_data()?;
    println!("all data cleared");
    Ok(())
}
