use crate::BuildArgs;
use crate::utils;
use colored::Colorize;
use dockstage_build::{DefaultProcessor, ImageBuilder};
use dockstage_manifest::ManifestError;

pub async fn handle(args: BuildArgs) -> anyhow::Result<()> {
    let (path, manifest) = utils::load_manifest(args.manifest.manifest.as_deref())?;

    if args.push && manifest.images.is_empty() {
        return Err(ManifestError::NoImages.into());
    }

    let options = utils::resolve_options(manifest.options, &args.options);
    let images = utils::resolve_images(&manifest.images, args.tag.as_deref())?;
    let stage_dir = utils::resolve_stage_dir(&manifest, args.stage_dir)?;
    let binary = utils::resolve_binary(&args.docker)?;
    let auth = utils::resolve_auth(&manifest, &images, &args.docker)?;

    println!("{}", "Dockerイメージをビルド中...".green());
    utils::print_manifest_summary(&path, &manifest);
    println!("ステージ: {}", stage_dir.display().to_string().cyan());
    println!("フラグ: {}", options.to_flags().join(" ").dimmed());
    for image in &images {
        println!("  → Image: {}", image.to_string().cyan());
    }
    println!();

    let builder = ImageBuilder::new(&binary);
    let image_id = builder
        .build_instructions(
            &DefaultProcessor,
            &manifest.instructions,
            &images,
            &options,
            &stage_dir,
            auth.credentials(),
        )
        .await?;

    println!(
        "{} {}",
        "✓ ビルド完了:".green().bold(),
        image_id.as_str().cyan()
    );

    if args.push {
        crate::commands::push::push_images(&binary, &images, &auth).await?;
    }

    Ok(())
}
