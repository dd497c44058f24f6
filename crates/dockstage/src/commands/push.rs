use crate::PushArgs;
use crate::utils;
use colored::Colorize;
use dockstage_build::ImagePusher;

pub async fn handle(args: PushArgs) -> anyhow::Result<()> {
    let (path, manifest) = utils::load_manifest(args.manifest.manifest.as_deref())?;
    utils::print_manifest_summary(&path, &manifest);

    let images = utils::resolve_images(manifest.require_images()?, args.tag.as_deref())?;
    let binary = utils::resolve_binary(&args.docker)?;
    let auth = utils::resolve_auth(&manifest, &images, &args.docker)?;

    push_images(&binary, &images, &auth).await
}

/// イメージを順にプッシュ（build --push からも使用）
pub async fn push_images(
    binary: &std::path::Path,
    images: &[dockstage_build::ImageName],
    auth: &utils::ResolvedAuth,
) -> anyhow::Result<()> {
    println!();
    println!("{}", "📤 イメージをプッシュ中...".blue());
    for image in images {
        println!("  • {}", image.to_string().cyan());
    }

    ImagePusher::new(binary)
        .keep_login(auth.from_docker_config)
        .push(images, auth.credentials())
        .await?;

    println!("{}", "✓ プッシュ完了".green());
    Ok(())
}
