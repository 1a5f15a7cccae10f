// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn requirements_path_arg() -> Arg {
    Arg::new("requirements_path")
        .long("requirements-path")
        .value_name("PATH")
        .help("Requirements file (default: nearest requirements.txt upwards)")
}

fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .long("db-path")
        .value_name("PATH")
        .help("Database path (default: pirg_pkg_db.txt in the temp directory)")
}

fn pip_args_arg() -> Arg {
    Arg::new("pip_args")
        .num_args(0..)
        .last(true)
        .help("Arguments forwarded to pip")
}

fn build_cli() -> Command {
    Command::new("pirg")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pirg Contributors")
        .about("Install packages with pip and keep requirements.txt in sync")
        .subcommand_required(false)
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log level (overridden by RUST_LOG)"),
        )
        .arg(
            Arg::new("index_url")
                .long("index-url")
                .global(true)
                .default_value("https://pypi.org")
                .help("Package index base URL"),
        )
        .arg(
            Arg::new("python_version")
                .long("python-version")
                .global(true)
                .help("Python version releases must support"),
        )
        .arg(
            Arg::new("python")
                .long("python")
                .global(true)
                .default_value("python3")
                .help("Interpreter asked for its version when --python-version is omitted"),
        )
        .arg(
            Arg::new("pip")
                .long("pip")
                .global(true)
                .default_value("pip")
                .help("Package manager program"),
        )
        .subcommand(
            Command::new("install")
                .about("Install packages and record them in the requirements file")
                .arg(Arg::new("packages").num_args(0..).help("Package tokens, e.g. numpy, requests>=2.0"))
                .arg(requirements_path_arg())
                .arg(
                    Arg::new("update_all")
                        .long("update-all")
                        .action(ArgAction::SetTrue)
                        .help("Re-pin every recorded package to its newest compatible release"),
                )
                .arg(pip_args_arg()),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Uninstall packages and remove them from the requirements file")
                .arg(Arg::new("packages").num_args(0..).help("Package names"))
                .arg(requirements_path_arg())
                .arg(
                    Arg::new("delete_all")
                        .long("delete-all")
                        .action(ArgAction::SetTrue)
                        .help("Remove every recorded package"),
                )
                .arg(pip_args_arg()),
        )
        .subcommand(
            Command::new("search")
                .about("Search the local package-name database")
                .arg(Arg::new("query").required(true).help("Approximate package name"))
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("initdb")
                .about("Initialize or update the local package-name database")
                .arg(
                    Arg::new("update")
                        .long("update")
                        .action(ArgAction::SetTrue)
                        .help("Refresh the database if the index listing changed"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("pirg.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
