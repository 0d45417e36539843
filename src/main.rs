mod archive;
mod cli_install;
mod config;
mod credentials;
mod download;
mod error;
mod install;
mod logger;
mod manager;
mod menu;
mod paths;
mod platform;
mod privileges;
mod status;
mod systemd;
mod uninstall;
mod update;

use std::env;
use std::io;
use std::process::ExitCode;

use crate::config::Config;
use crate::error::ManagerError;
use crate::manager::Manager;
use crate::menu::Menu;
use crate::privileges::{require_command, require_root};

#[derive(Debug, PartialEq)]
enum Command {
    Menu,
    Help,
    Install(Option<String>),
    Update,
    Uninstall { assume_yes: bool },
    Status { json: bool },
    Start,
    Stop,
    Restart,
    Password(Option<String>),
}

impl Command {
    fn needs_root(&self) -> bool {
        !matches!(self, Command::Help | Command::Status { .. })
    }
}

fn usage(message: String) -> ManagerError {
    ManagerError::Usage(message)
}

fn parse_args(args: &[String]) -> Result<Command, ManagerError> {
    let Some(command) = args.first().map(|s| s.as_str()) else {
        return Ok(Command::Menu);
    };
    let rest = &args[1..];

    let no_extra = |cmd: Command| {
        if rest.is_empty() {
            Ok(cmd)
        } else {
            Err(usage(format!("`{}` takes no arguments", command)))
        }
    };

    match command {
        "help" | "-h" | "--help" => Ok(Command::Help),
        "install" => match rest {
            [] => Ok(Command::Install(None)),
            [path] => Ok(Command::Install(Some(path.clone()))),
            _ => Err(usage("`install` takes at most one path".to_string())),
        },
        "update" => no_extra(Command::Update),
        "uninstall" => match rest {
            [] => Ok(Command::Uninstall { assume_yes: false }),
            [flag] if flag == "-y" || flag == "--yes" => Ok(Command::Uninstall { assume_yes: true }),
            _ => Err(usage("`uninstall` takes no path argument".to_string())),
        },
        "status" => match rest {
            [] => Ok(Command::Status { json: false }),
            [flag] if flag == "--json" => Ok(Command::Status { json: true }),
            _ => Err(usage("`status` only accepts --json".to_string())),
        },
        "start" => no_extra(Command::Start),
        "stop" => no_extra(Command::Stop),
        "restart" => no_extra(Command::Restart),
        "password" => match rest {
            [] => Ok(Command::Password(None)),
            [password] => Ok(Command::Password(Some(password.clone()))),
            _ => Err(usage("`password` takes at most one value".to_string())),
        },
        other => Err(usage(format!("Unknown command: {}", other))),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("❌ {}", err);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    if command == Command::Help {
        print_help();
        return ExitCode::SUCCESS;
    }

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), ManagerError> {
    let config = Config::load()?;
    if let Err(e) = logger::init_logger(&config) {
        eprintln!("⚠️ {}", e);
    }

    require_command(&config.service.systemctl)?;
    if command.needs_root() {
        require_root()?;
    }

    let pause = config.menu_pause();
    let mut manager = Manager::new(config)?;

    match command {
        Command::Menu => {
            let stdin = io::stdin();
            let mut menu = Menu::new(stdin.lock(), io::stdout(), pause);
            menu.run(&mut manager)
        }
        Command::Help => Ok(()),
        Command::Install(path) => manager.install(path.as_deref()).map(|_| ()),
        Command::Update => manager.update().map(|_| ()),
        Command::Uninstall { assume_yes } => {
            let confirmed = assume_yes
                || menu::confirm(
                    &mut io::stdin().lock(),
                    &mut io::stdout(),
                    "Remove the service, install dir and all data?",
                )?;
            if confirmed {
                manager.uninstall()
            } else {
                println!("Aborted.");
                Ok(())
            }
        }
        Command::Status { json } => manager.print_status(json),
        Command::Start => manager.start(),
        Command::Stop => manager.stop(),
        Command::Restart => manager.restart(),
        Command::Password(None) => manager.random_password().map(|_| ()),
        Command::Password(Some(password)) => manager.set_password(&password).map(|_| ()),
    }
}

fn print_help() {
    println!("Usage: alistman [command]");
    println!("Commands:");
    println!("  (none)             - Interactive menu");
    println!("  install [path]     - Download, install and start alist");
    println!("  update             - Update alist to the latest release");
    println!("  uninstall [-y]     - Remove alist, its service and data");
    println!("  status [--json]    - Show install and service status");
    println!("  start|stop|restart - Control the alist service");
    println!("  password [new]     - Generate a random password or set one");
    println!("  help               - Show this help message");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_opens_menu() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Menu);
    }

    #[test]
    fn install_accepts_optional_path() {
        assert_eq!(
            parse_args(&args(&["install"])).unwrap(),
            Command::Install(None)
        );
        assert_eq!(
            parse_args(&args(&["install", "/data"])).unwrap(),
            Command::Install(Some("/data".to_string()))
        );
        assert!(parse_args(&args(&["install", "/a", "/b"])).is_err());
    }

    #[test]
    fn update_and_uninstall_reject_path_argument() {
        assert!(matches!(
            parse_args(&args(&["update", "/data"])),
            Err(ManagerError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["uninstall", "/data"])),
            Err(ManagerError::Usage(_))
        ));
        assert_eq!(
            parse_args(&args(&["uninstall", "-y"])).unwrap(),
            Command::Uninstall { assume_yes: true }
        );
    }

    #[test]
    fn unknown_command_is_usage_error() {
        assert!(matches!(
            parse_args(&args(&["frobnicate"])),
            Err(ManagerError::Usage(_))
        ));
    }

    #[test]
    fn status_does_not_need_root() {
        assert!(!Command::Status { json: true }.needs_root());
        assert!(Command::Update.needs_root());
    }
}
