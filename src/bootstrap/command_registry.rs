use clap::{value_parser, Arg, ArgMatches, Command};

pub const APP_NAME: &str = "xd-reserve";

/// server 子命令的参数，未指定的项沿用配置文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
}

impl ServerArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            host: matches.get_one::<String>("host").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            workers: matches.get_one::<usize>("workers").copied(),
        }
    }
}

fn server_command() -> Command {
    Command::new("server")
        .about("启动 Web 服务器")
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("设置服务器主机地址"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("设置服务器端口"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("WORKERS")
                .value_parser(value_parser!(usize))
                .help("设置工作线程数"),
        )
}

/// 构建命令行应用，不带子命令时等同于 server
pub fn build_cli() -> Command {
    Command::new(APP_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("预约登记服务")
        .subcommand(server_command())
        .subcommand(Command::new("version").about("显示版本信息"))
}

/// 显示版本信息
pub fn handle_version_command() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
