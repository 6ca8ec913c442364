use anyhow::Result;

fn main() -> Result<()> {
    buildcost_cli::main_entry()
}
