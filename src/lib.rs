pub mod breakpoints;
pub mod classname;
pub mod combination;
pub mod config;
pub mod direction;
pub mod document;
pub mod emission;
pub mod error;
pub mod generator;
pub mod media;
pub mod registry;
pub mod scanner;
pub mod styles;
pub mod template;

pub use emission::{CombinationPermissions, Compilation, RequestArgs, Settings};
pub use error::{DocumentError, EngineError, ModelError};
pub use generator::{GenerationResult, GeneratorConfig};

use globset::GlobSet;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build {
        inputs: Vec<String>,
        out: Option<String>,
        minify: bool,
        config: Option<String>,
        ignore: Vec<String>,
    },
    Watch {
        inputs: Vec<String>,
        out: Option<String>,
        minify: bool,
        config: Option<String>,
        ignore: Vec<String>,
        poll: bool,
        poll_interval_ms: u64,
    },
    Combinations {
        config: Option<String>,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build {
            inputs,
            out,
            minify,
            config,
            ignore,
        } => run_build(&BuildOptions {
            inputs,
            out,
            minify,
            config,
            ignore,
        }),
        Command::Watch {
            inputs,
            out,
            minify,
            config,
            ignore,
            poll,
            poll_interval_ms,
        } => run_watch(
            BuildOptions {
                inputs,
                out,
                minify,
                config,
                ignore,
            },
            poll,
            poll_interval_ms,
        ),
        Command::Combinations { config } => run_combinations(config.as_deref()),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "build" => parse_build_args("build", iter.collect()),
        "watch" => parse_build_args("watch", iter.collect()),
        "combinations" => parse_combinations_args(iter.collect()),
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

fn parse_build_args(command: &str, args: Vec<String>) -> Result<Command, CliError> {
    let watch = command == "watch";
    let mut inputs = Vec::new();
    let mut out = None;
    let mut minify = false;
    let mut config = None;
    let mut ignore = Vec::new();
    let mut poll = false;
    let mut poll_interval_ms = 500;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--out" | "--output" | "-o" => {
                out = Some(flag_value(command, &args, &mut idx, "--output")?);
            }
            "--config" | "-c" => {
                config = Some(flag_value(command, &args, &mut idx, "--config")?);
            }
            "--ignore" | "-I" => {
                ignore.push(flag_value(command, &args, &mut idx, "--ignore")?);
            }
            "--minify" | "-m" => {
                minify = true;
            }
            "--poll" if watch => {
                poll = true;
            }
            "--poll-interval" if watch => {
                let value = flag_value(command, &args, &mut idx, "--poll-interval")?;
                poll = true;
                poll_interval_ms = parse_u64_arg(&value, "--poll-interval")?;
            }
            "--poll" | "--poll-interval" => {
                return Err(CliError {
                    message: format!("{} is only supported with watch", args[idx]),
                });
            }
            value => {
                inputs.push(value.to_string());
            }
        }
        idx += 1;
    }

    if inputs.is_empty() {
        return Err(CliError {
            message: format!("{} requires at least one path or glob pattern", command),
        });
    }

    if watch {
        Ok(Command::Watch {
            inputs,
            out,
            minify,
            config,
            ignore,
            poll,
            poll_interval_ms,
        })
    } else {
        Ok(Command::Build {
            inputs,
            out,
            minify,
            config,
            ignore,
        })
    }
}

fn parse_combinations_args(args: Vec<String>) -> Result<Command, CliError> {
    let mut config = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                config = Some(flag_value("combinations", &args, &mut idx, "--config")?);
            }
            value => {
                return Err(CliError {
                    message: format!("unexpected argument for combinations: {}", value),
                });
            }
        }
        idx += 1;
    }

    Ok(Command::Combinations { config })
}

fn flag_value(
    command: &str,
    args: &[String],
    idx: &mut usize,
    flag: &str,
) -> Result<String, CliError> {
    *idx += 1;
    args.get(*idx).cloned().ok_or_else(|| CliError {
        message: format!("{} requires a value for {}", command, flag),
    })
}

fn parse_u64_arg(value: &str, flag: &str) -> Result<u64, CliError> {
    value.parse::<u64>().map_err(|_| CliError {
        message: format!("{} requires a positive integer, got '{}'", flag, value),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildOptions {
    inputs: Vec<String>,
    out: Option<String>,
    minify: bool,
    config: Option<String>,
    ignore: Vec<String>,
}

fn load_settings(config_path: Option<&str>) -> Result<Settings, CliError> {
    let config = match config_path {
        Some(path) => config::load(Path::new(path)).map_err(|err| CliError {
            message: err.to_string(),
        })?,
        None => config::Config::default(),
    };
    config.settings().map_err(|err| CliError {
        message: err.to_string(),
    })
}

/// Compiles every matched document into one pass.
fn build_css(options: &BuildOptions) -> Result<(GenerationResult, usize), CliError> {
    let settings = load_settings(options.config.as_deref())?;

    let mut ignore = options.ignore.clone();
    if let Some(out_path) = options.out.as_ref() {
        ignore.push(out_path.clone());
    }
    let scan = scanner::scan_globs(&options.inputs, &ignore).map_err(|err| CliError {
        message: err.to_string(),
    })?;

    let mut compilation = Compilation::new(settings);
    for source in &scan.documents {
        document::compile_source(&source.text, &mut compilation).map_err(|err| CliError {
            message: format!("{}: {}", source.path.display(), err),
        })?;
    }
    let chunks = compilation.finish().map_err(|err| CliError {
        message: err.to_string(),
    })?;
    let result = generator::generate(
        &chunks,
        &GeneratorConfig {
            minify: options.minify,
        },
    );

    Ok((result, scan.files_scanned()))
}

fn run_build(options: &BuildOptions) -> Result<(), CliError> {
    let (result, files_scanned) = build_css(options)?;

    if let Some(out_path) = options.out.as_ref() {
        fs::write(out_path, result.css.as_bytes()).map_err(|err| CliError {
            message: format!("failed to write output {}: {}", out_path, err),
        })?;
    } else {
        print!("{}", result.css);
    }

    tracing::info!(
        files = files_scanned,
        rules = result.rule_count,
        "compiled {} documents into {} rules",
        files_scanned,
        result.rule_count
    );
    Ok(())
}

fn run_watch(options: BuildOptions, poll: bool, poll_interval_ms: u64) -> Result<(), CliError> {
    run_build(&options)?;

    let (tx, rx) = channel();
    let ignore_set = scanner::build_globset(&options.ignore).ok();
    let mut watcher: Box<dyn notify::Watcher> = if poll {
        Box::new(
            notify::PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(Duration::from_millis(poll_interval_ms)),
            )
            .map_err(|err| CliError {
                message: format!("failed to start poll watcher: {}", err),
            })?,
        )
    } else {
        Box::new(notify::recommended_watcher(tx).map_err(|err| CliError {
            message: format!("failed to start watcher: {}", err),
        })?)
    };

    for root in watch_roots_for_build(&options.inputs, options.config.as_deref()) {
        watcher
            .watch(&root, notify::RecursiveMode::Recursive)
            .map_err(|err| CliError {
                message: format!("failed to watch {}: {}", root.display(), err),
            })?;
    }

    if poll {
        tracing::info!("watching for changes (polling, press Ctrl+C to stop)");
    } else {
        tracing::info!("watching for changes (press Ctrl+C to stop)");
    }

    let out_path = options.out.as_ref().map(PathBuf::from);
    let mut last_event = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event_result) => {
                let event = match event_result {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(%err, "watch error");
                        continue;
                    }
                };
                if should_ignore_event(&event, ignore_set.as_ref(), out_path.as_deref()) {
                    continue;
                }
                if last_event.elapsed() < Duration::from_millis(200) {
                    continue;
                }
                last_event = Instant::now();
                tracing::info!("change detected, rebuilding");
                if let Err(err) = run_build(&options) {
                    tracing::warn!("build failed: {}", err.message);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

fn run_combinations(config_path: Option<&str>) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    for key in combination::enumerate(&settings.model) {
        match media::media_query(&key) {
            Some(query) => println!("{}\t@media {}", key.slug(), query),
            None => println!("{}", key.slug()),
        }
    }
    Ok(())
}

fn print_help() {
    println!("cssmatrix");
    println!();
    println!("USAGE:");
    println!(
        "  cssmatrix build [--output <path>] [--minify] [--config <path>] [--ignore <glob>] <glob...>"
    );
    println!(
        "  cssmatrix watch [--output <path>] [--minify] [--config <path>] [--ignore <glob>] [--poll] [--poll-interval <ms>] <glob...>"
    );
    println!("  cssmatrix combinations [--config <path>]");
    println!();
    println!("EXAMPLES:");
    println!("  cssmatrix build --output dist/site.css \"styles/**/*.cssm\"");
    println!("  cssmatrix build -c cssmatrix.toml --minify \"styles/**/*.cssm\"");
    println!("  cssmatrix build -I \"**/vendor/**\" \"styles/**/*.cssm\"");
    println!("  cssmatrix watch --poll --poll-interval 250 -o dist/site.css \"styles/**/*.cssm\"");
    println!("  cssmatrix combinations -c cssmatrix.toml");
    println!();
    println!("Set CSSMATRIX_LOG (e.g. CSSMATRIX_LOG=debug) to control log output.");
}

fn watch_roots(patterns: &[String]) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let root = scanner::glob_root(pattern);
        let normalized = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        if seen.insert(normalized.clone()) {
            roots.push(normalized);
        }
    }

    roots
}

fn watch_roots_for_build(patterns: &[String], config: Option<&str>) -> Vec<PathBuf> {
    let mut extra = patterns.to_vec();
    extra.extend(config.map(str::to_string));
    watch_roots(&extra)
}

fn should_ignore_event(
    event: &notify::Event,
    ignore_set: Option<&GlobSet>,
    out_path: Option<&Path>,
) -> bool {
    if event.paths.is_empty() {
        return false;
    }
    event.paths.iter().all(|path| {
        ignore_set.is_some_and(|set| set.is_match(path))
            || out_path.is_some_and(|out| path.ends_with(out))
    })
}

#[cfg(test)]
mod tests {
    use super::{BuildOptions, Command, build_css, parse_args, should_ignore_event, watch_roots_for_build};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_build_flags() {
        let command = parse_args(args(&[
            "build",
            "-o",
            "dist/site.css",
            "--minify",
            "-c",
            "cssmatrix.toml",
            "-I",
            "**/vendor/**",
            "styles/**/*.cssm",
        ]))
        .expect("build args should parse");
        assert_eq!(
            command,
            Command::Build {
                inputs: vec!["styles/**/*.cssm".to_string()],
                out: Some("dist/site.css".to_string()),
                minify: true,
                config: Some("cssmatrix.toml".to_string()),
                ignore: vec!["**/vendor/**".to_string()],
            }
        );
    }

    #[test]
    fn parses_watch_polling() {
        let command = parse_args(args(&["watch", "--poll-interval", "250", "a.cssm"]))
            .expect("watch args should parse");
        assert_eq!(
            command,
            Command::Watch {
                inputs: vec!["a.cssm".to_string()],
                out: None,
                minify: false,
                config: None,
                ignore: Vec::new(),
                poll: true,
                poll_interval_ms: 250,
            }
        );
    }

    #[test]
    fn parses_combinations_and_help() {
        assert_eq!(
            parse_args(args(&["combinations", "--config", "c.toml"])),
            Ok(Command::Combinations {
                config: Some("c.toml".to_string())
            })
        );
        assert_eq!(parse_args(Vec::new()), Ok(Command::Help));
        assert_eq!(parse_args(args(&["--help"])), Ok(Command::Help));
    }

    #[test]
    fn rejects_invalid_arguments() {
        let cases = [
            (vec!["build"], "build requires at least one path or glob pattern"),
            (vec!["build", "--poll", "a.cssm"], "--poll is only supported with watch"),
            (vec!["build", "a.cssm", "--output"], "build requires a value for --output"),
            (
                vec!["watch", "--poll-interval", "soon", "a.cssm"],
                "--poll-interval requires a positive integer, got 'soon'",
            ),
            (vec!["combinations", "extra"], "unexpected argument for combinations: extra"),
            (vec!["compile"], "unknown command: compile"),
        ];
        for (values, message) in cases {
            let err = parse_args(args(&values)).expect_err("arguments should be rejected");
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn watch_roots_include_config_path() {
        let roots = watch_roots_for_build(
            &["packages/app/styles/**/*.cssm".to_string()],
            Some("config/cssmatrix.toml"),
        );
        assert_eq!(
            roots,
            vec![PathBuf::from("packages/app/styles/"), PathBuf::from("config")]
        );
    }

    #[test]
    fn ignores_events_for_the_output_file() {
        let event = notify::Event::new(notify::EventKind::Any).add_path(PathBuf::from("/work/dist/site.css"));
        assert!(should_ignore_event(&event, None, Some(Path::new("dist/site.css"))));
        assert!(!should_ignore_event(&event, None, None));
    }

    #[test]
    fn builds_documents_as_one_pass() {
        let base = temp_dir("cssmatrix_build");
        let _ = fs::create_dir_all(&base);
        let _ = fs::write(
            base.join("a.cssm"),
            "@define-object card { @classname { float: left; } }\n",
        );
        let _ = fs::write(base.join("b.cssm"), "@object card(from: m);\n.page{margin:0}\n");
        let config = base.join("cssmatrix.toml");
        let _ = fs::write(&config, "namespace = \"jig\"\n");

        let options = BuildOptions {
            inputs: vec![format!("{}/*.cssm", base.display())],
            out: None,
            minify: true,
            config: Some(config.display().to_string()),
            ignore: Vec::new(),
        };
        let (result, files) = build_css(&options).expect("build should succeed");
        assert_eq!(files, 2);
        assert_eq!(
            result.css.to_string(),
            "@media (min-width:45em){.jig-card--from-m{float:left}}.page{margin:0}"
        );

        let _ = fs::write(base.join("c.cssm"), "@object card(from: xl);\n");
        let err = build_css(&options).expect_err("unknown breakpoint must fail");
        assert!(err.message.ends_with(
            "c.cssm: line 1: xl is not defined in the lengths breakpoints map (from card)"
        ));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rebuilds_start_from_a_fresh_pass() {
        let base = temp_dir("cssmatrix_rebuild");
        let _ = fs::create_dir_all(&base);
        let _ = fs::write(
            base.join("main.cssm"),
            "@define-object foo { @classname { k: v; } }\n@object foo;\n",
        );

        let options = BuildOptions {
            inputs: vec![format!("{}/*.cssm", base.display())],
            out: None,
            minify: true,
            config: None,
            ignore: Vec::new(),
        };
        let (first, _) = build_css(&options).expect("first build should succeed");
        let (second, _) = build_css(&options).expect("second build should succeed");
        assert_eq!(first.css.to_string(), ".foo{k:v}");
        assert_eq!(second.css.to_string(), ".foo{k:v}");

        let _ = fs::remove_dir_all(&base);
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}", prefix, nanos))
    }
}
