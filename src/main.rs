use clap::ArgMatches;
use std::error::Error;

use xd_reserve::conf::AppSettings;
use xd_reserve::error::AppResult;
use xd_reserve::{build_cli, handle_version_command, init_tracing, AppBootstrap, ServerArgs};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 构建命令行应用
    let matches: ArgMatches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("version", _)) => {
            handle_version_command();
        }
        Some(("server", sub_matches)) => {
            handle_server_command(ServerArgs::from_matches(sub_matches)).await?;
        }
        _ => {
            // 未指定子命令时直接启动服务器
            handle_server_command(ServerArgs::default()).await?;
        }
    }

    Ok(())
}

async fn handle_server_command(args: ServerArgs) -> AppResult<()> {
    // 配置错误统一转换为 AppError::Config
    let mut settings = AppSettings::load()?;
    settings.apply_overrides(args.host, args.port, args.workers)?;

    init_tracing(&settings.logging)?;

    // 打印配置摘要
    settings.print_config_summary();

    // 启动应用
    AppBootstrap::new(settings).run().await?;

    Ok(())
}
