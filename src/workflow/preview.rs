//! Workflow preview step: show what would be sent, without calling a model.
use super::context::{load_input, load_run_config, pipeline_options, ConfigOverrides};
use crate::cli::PreviewArgs;
use crate::pipeline::display_name;
use crate::prompt::SYSTEM_INSTRUCTION;
use anyhow::Result;

pub(crate) fn run_preview(args: &PreviewArgs) -> Result<()> {
    let loaded = load_run_config(args.config.as_deref(), &ConfigOverrides::default())?;
    let table = load_input(&args.input, args.sheet.as_deref())?;
    let options = pipeline_options(&loaded)?;

    println!("input: {}", args.input.display());
    println!("rows: {}", table.len());
    println!("columns: {}", table.columns().join(", "));
    println!();
    for row in table.rows() {
        println!(
            "{:>5}  {}",
            row.index() + 1,
            display_name(row, &options.display_columns)
        );
    }

    if args.rows > 0 && !table.is_empty() {
        println!();
        println!("--- system instruction ---");
        println!("{}", SYSTEM_INSTRUCTION.trim_end());
    }
    for row in table.rows().iter().take(args.rows) {
        println!();
        println!("--- prompt for row {} ---", row.index() + 1);
        println!("{}", options.template.render(row));
    }
    Ok(())
}
