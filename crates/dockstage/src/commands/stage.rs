use crate::StageArgs;
use crate::utils;
use colored::Colorize;
use dockstage_build::{DOCKERFILE_NAME, DefaultProcessor, Processor, StageWriter};

pub fn handle(args: StageArgs) -> anyhow::Result<()> {
    let (path, manifest) = utils::load_manifest(args.manifest.manifest.as_deref())?;
    utils::print_manifest_summary(&path, &manifest);

    let stage_dir = utils::resolve_stage_dir(&manifest, args.stage_dir)?;
    let staged = DefaultProcessor.process(&manifest.instructions, &stage_dir)?;
    let bytes = StageWriter::stage(&staged, &stage_dir)?;

    println!();
    println!(
        "{} {}",
        "✓ ビルドコンテキストを作成しました:".green(),
        stage_dir.display().to_string().cyan()
    );
    println!("  → {}", DOCKERFILE_NAME);
    for (source, destination) in staged.stage_files() {
        println!(
            "  → {} ← {}",
            destination.display(),
            source.describe().dimmed()
        );
    }
    println!("  合計: {} bytes", bytes);

    Ok(())
}
