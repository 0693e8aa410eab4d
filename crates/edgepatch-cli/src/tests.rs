use super::*;
use crate::config::{config_home_from, default_config_path_from, FileConfig, PatchSettings};
use crate::flows::{
    format_doctor_lines, format_installation_lines, format_restart_lines, format_shutdown_lines,
    patch_installation, select_installations, InstallationReport,
};
use crate::render::{
    render_progress_line, render_section_header, render_status_line, resolve_output_style,
    OutputStyle,
};
use clap::error::ErrorKind;
use clap::CommandFactory;
use edgepatch_core::{ChannelTable, Installation, InstallationLayout, Platform};
use edgepatch_patcher::{PatchStatus, ProfileOutcome, ProfileStatus, WriteMode};
use edgepatch_process::{
    LaunchOutcome, LaunchStatus, ProcessOutcome, ShutdownReport, ShutdownStatus,
    TerminatedProcess,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "edgepatch-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test root");
    path
}

fn seed_installation(root: &Path, version: Option<&str>, local_state: &str) -> Installation {
    fs::create_dir_all(root.join("Default")).expect("must create profile");
    if let Some(version) = version {
        fs::write(root.join("Last Version"), version).expect("must write version");
    }
    fs::write(root.join("Local State"), local_state).expect("must write local state");
    fs::write(root.join("Default").join("Preferences"), "{}").expect("must write prefs");
    Installation {
        channel: Channel::Stable,
        layout: InstallationLayout::new(root),
    }
}

fn settings() -> PatchSettings {
    PatchSettings::resolve(
        &PatchArgs::default(),
        &FileConfig::default(),
        Platform::Linux,
        false,
    )
    .expect("must resolve defaults")
}

#[test]
fn cli_without_subcommand_defaults_to_patch() {
    let cli = Cli::try_parse_from(["edgepatch"]).expect("must parse");
    assert!(cli.command.is_none());
    assert!(!cli.plain);
}

#[test]
fn cli_parses_patch_flags() {
    let cli = Cli::try_parse_from([
        "edgepatch",
        "--plain",
        "patch",
        "--channel",
        "beta",
        "--channel",
        "Canary",
        "--country",
        "gb",
        "--no-restart",
        "--dry-run",
    ])
    .expect("must parse");
    assert!(cli.plain);
    let Some(Commands::Patch(args)) = cli.command else {
        panic!("expected patch command");
    };
    assert_eq!(args.channels, vec![Channel::Beta, Channel::Canary]);
    assert_eq!(args.country.as_deref(), Some("gb"));
    assert!(args.no_restart);
    assert!(args.dry_run);
    assert!(!args.no_shutdown);
}

#[test]
fn cli_rejects_unknown_channel() {
    let err = Cli::try_parse_from(["edgepatch", "patch", "--channel", "nightly"])
        .expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn cli_rejects_pause_with_no_pause() {
    let err = Cli::try_parse_from(["edgepatch", "patch", "--pause", "--no-pause"])
        .expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn cli_parses_completions_shell() {
    let cli = Cli::try_parse_from(["edgepatch", "completions", "zsh"]).expect("must parse");
    assert!(matches!(
        cli.command,
        Some(Commands::Completions { shell: Shell::Zsh })
    ));
}

#[test]
fn every_flag_carries_help_text() {
    let command = Cli::command();
    let patch = command.find_subcommand("patch").expect("patch subcommand");
    for arg in command.get_arguments().chain(patch.get_arguments()) {
        if arg.is_positional() || matches!(arg.get_id().as_str(), "help" | "version") {
            continue;
        }
        assert!(arg.get_help().is_some(), "--{} has no help", arg.get_id());
    }
}

#[test]
fn completion_script_names_binary() {
    let mut output = Vec::new();
    completion::write_completions_script(Shell::Bash, &mut output).expect("must write");
    let script = String::from_utf8(output).expect("utf8");
    assert!(script.contains("edgepatch"));
    assert!(script.contains("--dry-run"));
}

#[test]
fn file_config_parses_channel_overrides() {
    let config = FileConfig::parse(
        r#"
country = "gb"
restart = false

[[channels.linux]]
channel = "stable"
path = "flatpak/edge"

[[channels.linux]]
channel = "beta"
path = "flatpak/edge-beta"
"#,
    )
    .expect("must parse");

    assert_eq!(config.country.as_deref(), Some("gb"));
    assert_eq!(config.restart, Some(false));
    let linux = config.channel_table(Platform::Linux);
    assert_eq!(linux.entries().len(), 2);
    assert_eq!(linux.entries()[1].channel, Channel::Beta);
    assert_eq!(linux.entries()[1].relative, PathBuf::from("flatpak/edge-beta"));
    assert_eq!(
        config.channel_table(Platform::MacOs),
        ChannelTable::builtin(Platform::MacOs)
    );
}

#[test]
fn file_config_rejects_unknown_platform_key() {
    let err = FileConfig::parse("[[channels.haiku]]\nchannel = \"stable\"\npath = \"x\"\n")
        .expect_err("must reject");
    assert!(format!("{err:#}").contains("unsupported platform: haiku"));
}

#[test]
fn file_config_rejects_unknown_fields() {
    assert!(FileConfig::parse("colour = \"US\"\n").is_err());
}

#[test]
fn config_home_follows_platform_conventions() {
    let env = HashMap::from([
        ("APPDATA", "C:\\Users\\a\\AppData\\Roaming"),
        ("HOME", "/home/a"),
    ]);
    let lookup = |name: &str| env.get(name).map(|value| value.to_string());

    assert_eq!(
        config_home_from(Platform::Windows, lookup),
        Some(PathBuf::from("C:\\Users\\a\\AppData\\Roaming"))
    );
    assert_eq!(
        config_home_from(Platform::Linux, lookup),
        Some(PathBuf::from("/home/a").join(".config"))
    );

    let xdg = HashMap::from([("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/a")]);
    assert_eq!(
        config_home_from(Platform::MacOs, |name: &str| xdg
            .get(name)
            .map(|value| value.to_string())),
        Some(PathBuf::from("/xdg"))
    );
}

#[test]
fn default_config_path_prefers_env_override() {
    let env = HashMap::from([("EDGEPATCH_CONFIG", "/etc/edgepatch.toml"), ("HOME", "/home/a")]);
    let lookup = |name: &str| env.get(name).map(|value| value.to_string());
    assert_eq!(
        default_config_path_from(Platform::Linux, lookup),
        Some(PathBuf::from("/etc/edgepatch.toml"))
    );

    let env = HashMap::from([("HOME", "/home/a")]);
    let lookup = |name: &str| env.get(name).map(|value| value.to_string());
    assert_eq!(
        default_config_path_from(Platform::Linux, lookup),
        Some(
            PathBuf::from("/home/a")
                .join(".config")
                .join("edgepatch")
                .join("config.toml")
        )
    );
}

#[test]
fn load_config_requires_explicit_file_to_exist() {
    let root = test_root();
    let err = config::load_config(Some(root.join("missing.toml").as_path()), Platform::Linux)
        .expect_err("must fail");
    assert!(err.to_string().contains("config file not found"));

    let path = root.join("config.toml");
    fs::write(&path, "country = \"DE\"\n").expect("must write");
    let config = config::load_config(Some(path.as_path()), Platform::Linux).expect("must load");
    assert_eq!(config.country.as_deref(), Some("DE"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn settings_default_to_us_with_shutdown_and_restart() {
    let settings = settings();
    assert_eq!(settings.country, "US");
    assert!(settings.shutdown);
    assert!(settings.restart);
    assert!(!settings.pause);
    assert!(!settings.dry_run);
    assert_eq!(settings.table, ChannelTable::builtin(Platform::Linux));
}

#[test]
fn settings_flags_override_config() {
    let config = FileConfig {
        country: Some("de".to_string()),
        restart: Some(true),
        pause: Some(true),
        ..FileConfig::default()
    };
    let args = PatchArgs {
        country: Some("fr".to_string()),
        no_restart: true,
        no_pause: true,
        ..PatchArgs::default()
    };

    let settings =
        PatchSettings::resolve(&args, &config, Platform::Linux, true).expect("must resolve");
    assert_eq!(settings.country, "FR");
    assert!(!settings.restart);
    assert!(!settings.pause);

    let settings = PatchSettings::resolve(&PatchArgs::default(), &config, Platform::Linux, false)
        .expect("must resolve");
    assert_eq!(settings.country, "DE");
    assert!(settings.pause);
}

#[test]
fn settings_pause_by_default_only_on_interactive_windows() {
    let config = FileConfig::default();
    let args = PatchArgs::default();
    let resolve = |platform, interactive| {
        PatchSettings::resolve(&args, &config, platform, interactive)
            .expect("must resolve")
            .pause
    };
    assert!(resolve(Platform::Windows, true));
    assert!(!resolve(Platform::Windows, false));
    assert!(!resolve(Platform::Linux, true));
}

#[test]
fn settings_reject_invalid_country() {
    for country in ["USA", "U", "1A", ""] {
        let args = PatchArgs {
            country: Some(country.to_string()),
            ..PatchArgs::default()
        };
        assert!(
            PatchSettings::resolve(&args, &FileConfig::default(), Platform::Linux, false).is_err(),
            "{country:?}"
        );
    }
}

#[test]
fn select_installations_is_fatal_when_nothing_was_found() {
    let err = select_installations(&settings(), Vec::new()).expect_err("must fail");
    assert_eq!(err.to_string(), "no available user data path found");
}

#[test]
fn select_installations_applies_channel_filter() {
    let mut settings = settings();
    settings.channels = vec![Channel::Dev];
    let installations = vec![
        Installation {
            channel: Channel::Stable,
            layout: InstallationLayout::new("/stable"),
        },
        Installation {
            channel: Channel::Dev,
            layout: InstallationLayout::new("/dev"),
        },
    ];

    let selected = select_installations(&settings, installations.clone()).expect("must select");
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].channel, Channel::Dev);

    settings.channels = vec![Channel::Canary];
    let err = select_installations(&settings, installations).expect_err("must fail");
    assert_eq!(err.to_string(), "no installation found for channel(s): canary");
}

#[test]
fn patch_installation_patches_local_state_and_profiles() {
    let root = test_root();
    let installation = seed_installation(
        &root,
        Some("120.0.2210.91\n"),
        r#"{"variations_country":"CN"}"#,
    );

    let report = patch_installation(&installation, "US", WriteMode::Write);
    assert_eq!(report.version, Ok("120.0.2210.91".to_string()));
    assert_eq!(report.local_state, Some(Ok(PatchStatus::Patched)));
    assert_eq!(
        report.preferences,
        Some(Ok(vec![ProfileOutcome {
            profile: "Default".to_string(),
            status: ProfileStatus::Patched,
        }]))
    );

    let lines = format_installation_lines(&report, OutputStyle::Plain, WriteMode::Write);
    assert_eq!(
        lines,
        vec![
            format!("Patching Edge stable 120.0.2210.91 \"{}\"", root.display()),
            "Succeeded in patching Local State".to_string(),
            "Succeeded in patching Preferences of Default".to_string(),
        ]
    );

    let again = patch_installation(&installation, "US", WriteMode::Write);
    let lines = format_installation_lines(&again, OutputStyle::Plain, WriteMode::Write);
    assert_eq!(lines[1], "No need to patch Local State");
    assert_eq!(lines[2], "No need to patch Preferences of Default");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn patch_installation_skips_when_version_marker_is_missing() {
    let root = test_root();
    let original = r#"{"variations_country":"CN"}"#;
    let installation = seed_installation(&root, None, original);

    let report = patch_installation(&installation, "US", WriteMode::Write);
    assert!(report.version.is_err());
    assert!(report.local_state.is_none());
    assert!(report.preferences.is_none());
    assert_eq!(
        fs::read_to_string(root.join("Local State")).expect("must read"),
        original
    );

    let lines = format_installation_lines(&report, OutputStyle::Plain, WriteMode::Write);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Failed to get version of Edge stable: file not found"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn patch_installation_skips_invalid_version_format() {
    let root = test_root();
    let installation = seed_installation(&root, Some("not-a-version"), "{}");

    let report = patch_installation(&installation, "US", WriteMode::Write);
    assert_eq!(
        report.version,
        Err("invalid version format: 'not-a-version'".to_string())
    );
    assert!(report.local_state.is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn format_installation_lines_reports_soft_errors_and_dry_run() {
    let report = InstallationReport {
        channel: Channel::Beta,
        root: PathBuf::from("/edge-beta"),
        version: Ok("121.0.1".to_string()),
        local_state: Some(Err("failed to parse".to_string())),
        preferences: Some(Ok(vec![
            ProfileOutcome {
                profile: "Default".to_string(),
                status: ProfileStatus::Patched,
            },
            ProfileOutcome {
                profile: "Profile 1".to_string(),
                status: ProfileStatus::Missing,
            },
            ProfileOutcome {
                profile: "Profile 2".to_string(),
                status: ProfileStatus::Failed("denied".to_string()),
            },
        ])),
    };

    let lines = format_installation_lines(&report, OutputStyle::Rich, WriteMode::DryRun);
    assert_eq!(
        lines,
        vec![
            format!(
                "[..] Patching Edge beta 121.0.1 \"{}\"",
                Path::new("/edge-beta").display()
            ),
            "[ERR] Error patching Local State: failed to parse".to_string(),
            "[OK] Would patch Preferences of Default".to_string(),
            "[ERR] Failed to patch Preferences of Profile 2: denied".to_string(),
        ]
    );
}

#[test]
fn format_shutdown_lines_summarizes_terminations_and_failures() {
    let report = ShutdownReport {
        terminated: vec![TerminatedProcess {
            pid: 10,
            exe: PathBuf::from("/opt/microsoft/msedge/msedge"),
        }],
        outcomes: vec![
            ProcessOutcome {
                pid: 10,
                name: "msedge".to_string(),
                status: ShutdownStatus::Terminated,
            },
            ProcessOutcome {
                pid: 11,
                name: "msedge".to_string(),
                status: ShutdownStatus::SkippedChild,
            },
            ProcessOutcome {
                pid: 12,
                name: "msedge".to_string(),
                status: ShutdownStatus::KillFailed,
            },
        ],
    };

    assert_eq!(
        format_shutdown_lines(&report, OutputStyle::Plain),
        vec![
            "Shutdown Edge (1 process(es))".to_string(),
            "1 Edge process(es) could not be stopped".to_string(),
        ]
    );
    assert!(format_shutdown_lines(&ShutdownReport::default(), OutputStyle::Plain).is_empty());
}

#[test]
fn format_restart_lines_reports_each_launch() {
    let outcomes = vec![
        LaunchOutcome {
            exe: PathBuf::from("/opt/edge"),
            status: LaunchStatus::Started { pid: 42 },
        },
        LaunchOutcome {
            exe: PathBuf::from("/opt/edge-beta"),
            status: LaunchStatus::Failed("not found".to_string()),
        },
    ];

    assert_eq!(
        format_restart_lines(&outcomes, OutputStyle::Rich),
        vec![
            format!("[OK] Starting: {}", Path::new("/opt/edge").display()),
            format!(
                "[ERR] Failed to start {}: not found",
                Path::new("/opt/edge-beta").display()
            ),
        ]
    );
}

#[test]
fn format_doctor_lines_lists_every_channel() {
    let home = test_root();
    let stable = home.join(".config").join("microsoft-edge");
    fs::create_dir_all(&stable).expect("must create dir");
    fs::write(stable.join("Last Version"), "120.0.1\n").expect("must write");

    let lines = format_doctor_lines(Platform::Linux, &home, &settings());
    assert_eq!(lines[0], "platform: linux");
    assert_eq!(lines[2], "country: US");
    assert_eq!(
        lines[3],
        format!("stable: 120.0.1 ({})", stable.display())
    );
    assert!(lines[4].starts_with("canary: missing"));
    assert_eq!(lines.len(), 7);

    let _ = fs::remove_dir_all(&home);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "Succeeded in patching Local State"),
        "Succeeded in patching Local State"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "Done"),
        "[OK] Done"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "Failed to shutdown Edge"),
        "[WARN] Failed to shutdown Edge"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "Restart Edge"),
        "[..] Restart Edge"
    );
}

#[test]
fn output_style_is_plain_when_requested_or_piped() {
    assert_eq!(resolve_output_style(false, true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn section_headers_and_progress_lines_only_render_in_rich_mode() {
    assert_eq!(render_section_header(OutputStyle::Plain, "patch"), None);
    assert_eq!(
        render_section_header(OutputStyle::Rich, "patch").as_deref(),
        Some("== patch ==")
    );
    assert!(render_progress_line(OutputStyle::Plain, "patch", 1, 2, None).is_none());
    let line = render_progress_line(OutputStyle::Rich, "patch", 1, 2, None).expect("rich line");
    assert!(line.contains(" 50% 1/2"));
}
