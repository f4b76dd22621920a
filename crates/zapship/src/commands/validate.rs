use colored::Colorize;

pub fn handle() -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let (project_root, config) = super::load_config(None, false)?;
    println!(
        "プロジェクトルート: {}",
        project_root.display().to_string().cyan()
    );
    println!("{}", "✓ pipeline.kdl は正常です！".green().bold());
    println!();
    println!("サマリー:");
    super::print_summary(&config);

    println!();
    println!("Dockerfile を検査中: {}", config.dockerfile_path().display());
    match super::check_recipe(&config) {
        Ok(true) => {
            println!("{}", "✓ Dockerfile に致命的な問題はありません".green().bold());
            Ok(())
        }
        Ok(false) => {
            eprintln!();
            eprintln!("{}", "✗ Dockerfile にエラーがあります".red().bold());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Dockerfile を読み込めません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
