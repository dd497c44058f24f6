use crate::OptionArgs;
use crate::utils;
use dockstage_build::BuildOptions;

/// ビルダーに渡されるフラグを1行で表示
pub fn handle(args: &OptionArgs) {
    let options = utils::resolve_options(BuildOptions::default(), args);
    println!("{}", options.to_flags().join(" "));
}
