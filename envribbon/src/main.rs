mod app;
mod core;
mod effect;
mod ipc;
#[cfg(target_os = "macos")]
mod macos;
mod platform;
mod preferences;
mod resolver;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use argh::FromArgs;
use envribbon_ipc::{Command, IpRule, Response, RibbonColor, RuleChanges, NO_SOUND};
use ipc::IpcClient;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// EnvRibbon - colored environment ribbons keyed by public IP
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommand {
    Start(StartCmd),
    Version(VersionCmd),
    Status(StatusCmd),
    ListRules(ListRulesCmd),
    AddRule(AddRuleCmd),
    UpdateRule(UpdateRuleCmd),
    RemoveRule(RemoveRuleCmd),
    SetDefault(SetDefaultCmd),
    Refresh(RefreshCmd),
    TestSound(TestSoundCmd),
    ListSounds(ListSoundsCmd),
    Quit(QuitCmd),
}

/// Start the envribbon daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "start")]
struct StartCmd {
    /// preferences file (default: ~/Library/Application Support/envribbon/preferences.json)
    #[argh(option)]
    preferences: Option<PathBuf>,
    /// seconds between public IP checks (default: 60)
    #[argh(option)]
    poll_interval: Option<u64>,
}

/// Show version information
#[derive(FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCmd {}

/// Show the current IP and ribbon
#[derive(FromArgs)]
#[argh(subcommand, name = "status")]
struct StatusCmd {}

/// List IP rules
#[derive(FromArgs)]
#[argh(subcommand, name = "list-rules")]
struct ListRulesCmd {}

/// Add a rule showing a ribbon for an IP
#[derive(FromArgs)]
#[argh(subcommand, name = "add-rule")]
struct AddRuleCmd {
    /// public IP to match (e.g., 203.0.113.7)
    #[argh(positional)]
    ip: String,
    /// ribbon text
    #[argh(positional)]
    label: String,
    /// ribbon color: name (red, blue, ...) or #RRGGBB[AA]
    #[argh(option)]
    color: Option<String>,
    /// sound played when the rule matches (see list-sounds)
    #[argh(option)]
    sound: Option<String>,
    /// seconds between sound repeats, 0 plays once
    #[argh(option)]
    interval: Option<u32>,
}

/// Change fields of an existing rule
#[derive(FromArgs)]
#[argh(subcommand, name = "update-rule")]
struct UpdateRuleCmd {
    /// rule id (from list-rules)
    #[argh(positional)]
    id: String,
    /// public IP to match
    #[argh(option)]
    ip: Option<String>,
    /// ribbon text
    #[argh(option)]
    label: Option<String>,
    /// ribbon color: name or #RRGGBB[AA]
    #[argh(option)]
    color: Option<String>,
    /// sound name, "None" to disable
    #[argh(option)]
    sound: Option<String>,
    /// seconds between sound repeats, 0 plays once
    #[argh(option)]
    interval: Option<u32>,
}

/// Remove a rule
#[derive(FromArgs)]
#[argh(subcommand, name = "remove-rule")]
struct RemoveRuleCmd {
    /// rule id (from list-rules)
    #[argh(positional)]
    id: String,
}

/// Set the ribbon shown when no rule matches (empty text hides it)
#[derive(FromArgs)]
#[argh(subcommand, name = "set-default")]
struct SetDefaultCmd {
    /// ribbon text
    #[argh(positional)]
    label: String,
    /// ribbon color: name or #RRGGBB[AA]
    #[argh(option)]
    color: Option<String>,
}

/// Check the public IP now
#[derive(FromArgs)]
#[argh(subcommand, name = "refresh")]
struct RefreshCmd {}

/// Play a sound
#[derive(FromArgs)]
#[argh(subcommand, name = "test-sound")]
struct TestSoundCmd {
    /// sound name (see list-sounds)
    #[argh(positional)]
    name: String,
}

/// List available sounds
#[derive(FromArgs)]
#[argh(subcommand, name = "list-sounds")]
struct ListSoundsCmd {}

/// Quit the envribbon daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "quit")]
struct QuitCmd {}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        None => {
            // No subcommand - show help (simulate --help)
            let args: Vec<&str> = vec!["envribbon", "--help"];
            match Cli::from_args(&args[..1], &args[1..]) {
                Ok(_) => {}
                Err(e) => {
                    println!("{}", e.output);
                }
            }
            Ok(())
        }
        Some(SubCommand::Start(cmd)) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();

            tracing::info!("envribbon {} starting", VERSION);
            run_daemon(cmd)
        }
        Some(SubCommand::Version(_)) => {
            println!("envribbon {}", VERSION);
            Ok(())
        }
        Some(subcmd) => run_cli(subcmd),
    }
}

#[cfg(target_os = "macos")]
fn run_daemon(cmd: StartCmd) -> Result<()> {
    use std::time::Duration;

    let mut config = core::Config::new();
    if let Some(path) = cmd.preferences {
        config = config.with_preferences_path(path);
    }
    if let Some(secs) = cmd.poll_interval {
        if secs == 0 {
            bail!("--poll-interval must be at least 1 second");
        }
        config = config.with_poll_interval(Duration::from_secs(secs));
    }
    tracing::debug!("Config: {:?}", config);
    app::App::run(config)
}

#[cfg(not(target_os = "macos"))]
fn run_daemon(_cmd: StartCmd) -> Result<()> {
    bail!("The envribbon daemon only runs on macOS")
}

fn run_cli(subcmd: SubCommand) -> Result<()> {
    let cmd = to_command(subcmd)?;
    let mut client = IpcClient::connect()?;
    let response = client.send(&cmd)?;

    match response {
        Response::Ok => {}
        Response::Error { message } => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
        Response::Status { status } => {
            println!("Current IP: {}", status.current_ip);
            match status.matched_rule {
                Some(id) => println!("Matched rule: {}", id),
                None => println!("Matched rule: none"),
            }
            match (status.ribbon, status.ribbon_color) {
                (Some(label), Some(color)) => println!(
                    "Ribbon: {} ({}) on {} displays",
                    label, color, status.ribbon_count
                ),
                _ => println!("Ribbon: hidden"),
            }
            if status.default_ribbon.label.is_empty() {
                println!("Default ribbon: none");
            } else {
                println!(
                    "Default ribbon: {} ({})",
                    status.default_ribbon.label, status.default_ribbon.color
                );
            }
            println!("Rules: {}", status.rule_count);
        }
        Response::Rules { rules } => {
            if rules.is_empty() {
                println!("No rules");
            }
            for rule in &rules {
                println!("{}", format_rule(rule));
            }
        }
        Response::Rule { rule } => {
            println!("{}", format_rule(&rule));
        }
        Response::Sounds { sounds } => {
            for sound in sounds {
                println!("{}", sound);
            }
        }
    }

    Ok(())
}

fn format_rule(rule: &IpRule) -> String {
    let mut line = format!("{}  {}  {}  {}", rule.id, rule.ip, rule.label, rule.color);
    if rule.sound != NO_SOUND {
        if rule.sound_interval > 0 {
            line.push_str(&format!(
                "  sound={} every {}s",
                rule.sound, rule.sound_interval
            ));
        } else {
            line.push_str(&format!("  sound={} once", rule.sound));
        }
    }
    line
}

fn to_command(subcmd: SubCommand) -> Result<Command> {
    match subcmd {
        SubCommand::Start(_) | SubCommand::Version(_) => {
            unreachable!("handled in main")
        }
        SubCommand::Status(_) => Ok(Command::GetStatus),
        SubCommand::ListRules(_) => Ok(Command::ListRules),
        SubCommand::AddRule(cmd) => {
            if cmd.ip.trim().is_empty() {
                bail!("IP must not be empty");
            }
            Ok(Command::AddRule {
                ip: cmd.ip,
                label: cmd.label,
                color: parse_color(cmd.color.as_deref())?,
                sound: cmd.sound,
                interval: cmd.interval,
            })
        }
        SubCommand::UpdateRule(cmd) => {
            let changes = RuleChanges {
                ip: cmd.ip,
                label: cmd.label,
                color: parse_color(cmd.color.as_deref())?,
                sound: cmd.sound,
                interval: cmd.interval,
            };
            if changes.is_empty() {
                bail!("Nothing to update (use --ip, --label, --color, --sound or --interval)");
            }
            Ok(Command::UpdateRule {
                id: parse_id(&cmd.id)?,
                changes,
            })
        }
        SubCommand::RemoveRule(cmd) => Ok(Command::RemoveRule {
            id: parse_id(&cmd.id)?,
        }),
        SubCommand::SetDefault(cmd) => Ok(Command::SetDefault {
            label: cmd.label,
            color: parse_color(cmd.color.as_deref())?,
        }),
        SubCommand::Refresh(_) => Ok(Command::Refresh),
        SubCommand::TestSound(cmd) => Ok(Command::TestSound { name: cmd.name }),
        SubCommand::ListSounds(_) => Ok(Command::ListSounds),
        SubCommand::Quit(_) => Ok(Command::Quit),
    }
}

fn parse_color(s: Option<&str>) -> Result<Option<RibbonColor>> {
    match s {
        Some(s) => match s.parse::<RibbonColor>() {
            Ok(color) => Ok(Some(color)),
            Err(e) => bail!(e),
        },
        None => Ok(None),
    }
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid rule id: {}", s))
}
