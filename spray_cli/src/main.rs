use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use spray_core::*;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spraytrack")]
#[command(about = "Spray rotation and reminder tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show next location, rotation counters, and schedule status (default)
    Status,

    /// Record a dose at a location (1-3)
    Dose {
        /// Location id: 1 = Left of Mouth, 2 = Right of Mouth, 3 = Under the Tongue
        location: u8,
    },

    /// Reset the rotation and start a new cycle
    Reset,

    /// Show or change the daily reminder schedule
    Schedule {
        #[command(subcommand)]
        action: Option<ScheduleAction>,
    },

    /// Show dose history
    History {
        /// How many days back to show
        #[arg(long)]
        days: Option<i64>,
    },

    /// Roll up the dose log to CSV
    Rollup {
        /// Clean up processed log files after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// Poll the schedule and fire due reminders
    Watch {
        /// Run a single poll and exit
        #[arg(long)]
        once: bool,

        /// Dismiss alerts automatically instead of prompting
        #[arg(long)]
        auto_dismiss: bool,

        /// Override the polling period in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Show the current schedule
    Show,

    /// Replace the schedule configuration
    Set {
        /// Turn the reminder schedule on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn the reminder schedule off
        #[arg(long, conflicts_with = "enable")]
        disable: bool,

        /// Daily window start (HH:MM)
        #[arg(long, default_value = "07:00")]
        start: String,

        /// Daily window end (HH:MM)
        #[arg(long, default_value = "23:59")]
        end: String,

        /// Hours between doses
        #[arg(long, default_value_t = 4)]
        every_hours: u32,

        /// Additional minutes between doses
        #[arg(long, default_value_t = 0)]
        every_minutes: u32,
    },
}

fn main() -> Result<()> {
    spray_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&data_dir, &config),
        Some(Commands::Dose { location }) => cmd_dose(&data_dir, &config, location),
        Some(Commands::Reset) => cmd_reset(&data_dir, &config),
        Some(Commands::Schedule { action }) => cmd_schedule(&data_dir, &config, action),
        Some(Commands::History { days }) => cmd_history(&data_dir, &config, days),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&data_dir, cleanup),
        Some(Commands::Watch {
            once,
            auto_dismiss,
            interval,
        }) => cmd_watch(&data_dir, &config, once, auto_dismiss, interval),
    }
}

fn open_tracker(data_dir: &PathBuf, config: &Config) -> Result<Tracker<SystemClock>> {
    Tracker::open(data_dir, config, SystemClock)
}

fn cmd_status(data_dir: &PathBuf, config: &Config) -> Result<()> {
    let tracker = open_tracker(data_dir, config)?;
    let state = tracker.state();
    let next = tracker.next_location();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  SPRAY TRACKER");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Next location: {} ({})", next.name, next.id);
    println!(
        "  Cycle {} - {}/{} locations used, {} total doses",
        state.current_cycle,
        state.used_count(),
        state.locations.len(),
        state.total_doses
    );
    println!();

    for location in &state.locations {
        let marker = if location.used { "x" } else { " " };
        match location.last_used {
            Some(at) => println!(
                "  [{}] {} {} (last {})",
                marker,
                location.id,
                location.name,
                at.format("%b %d %H:%M")
            ),
            None => println!("  [{}] {} {}", marker, location.id, location.name),
        }
    }

    println!();
    print_schedule_status(&tracker.status());

    let recent = tracker.recent_history(config.history.recent_entries);
    if !recent.is_empty() {
        println!("  Recent doses:");
        for event in recent {
            println!(
                "    {}  {} (cycle {})",
                event.timestamp.format("%b %d %H:%M"),
                event.location_name,
                event.cycle
            );
        }
        println!();
    }

    Ok(())
}

fn print_schedule_status(status: &ScheduleStatus) {
    if !status.enabled {
        println!("  Schedule: disabled");
        println!();
        return;
    }

    println!(
        "  Schedule: {}/{} doses completed today",
        status.completed_times.len(),
        status.scheduled_times.len()
    );
    match status.next_dose_time {
        Some(next) if status.is_overdue => {
            println!(
                "  ! Overdue: {} dose was {} minutes ago",
                next.format("%H:%M"),
                status.minutes_until_next.unwrap_or(0)
            );
        }
        Some(next) => {
            println!(
                "  Next dose at {} (in {} minutes)",
                next.format("%H:%M"),
                status.minutes_until_next.unwrap_or(0)
            );
        }
        None => println!("  All caught up for today"),
    }
    println!();
}

fn cmd_dose(data_dir: &PathBuf, config: &Config, location: u8) -> Result<()> {
    let mut tracker = open_tracker(data_dir, config)?;
    let event = tracker.record_dose(location)?;

    println!(
        "✓ Recorded dose at {} (cycle {}, {} total)",
        event.location_name,
        event.cycle,
        tracker.state().total_doses
    );

    let next = tracker.next_location();
    println!("  Next up: {} ({})", next.name, next.id);
    Ok(())
}

fn cmd_reset(data_dir: &PathBuf, config: &Config) -> Result<()> {
    let mut tracker = open_tracker(data_dir, config)?;
    tracker.reset_cycle()?;

    println!(
        "✓ Rotation reset - now on cycle {}",
        tracker.state().current_cycle
    );
    Ok(())
}

fn cmd_schedule(
    data_dir: &PathBuf,
    config: &Config,
    action: Option<ScheduleAction>,
) -> Result<()> {
    let mut tracker = open_tracker(data_dir, config)?;

    match action {
        None | Some(ScheduleAction::Show) => {
            let schedule = &tracker.state().schedule;
            println!(
                "Schedule: {}",
                if schedule.enabled { "enabled" } else { "disabled" }
            );
            println!(
                "  Window: {} - {}, every {}h{:02}m",
                schedule.start_time.format("%H:%M"),
                schedule.end_time.format("%H:%M"),
                schedule.interval_hours,
                schedule.interval_minutes
            );
            print_schedule_status(&tracker.status());
        }
        Some(ScheduleAction::Set {
            enable,
            disable,
            start,
            end,
            every_hours,
            every_minutes,
        }) => {
            let previously_enabled = tracker.state().schedule.enabled;
            let schedule = ScheduleConfig {
                enabled: if disable { false } else { enable || previously_enabled },
                start_time: parse_time(&start)?,
                end_time: parse_time(&end)?,
                interval_hours: every_hours,
                interval_minutes: every_minutes,
            };

            tracker.set_schedule(schedule)?;
            println!("✓ Schedule updated");
            print_schedule_status(&tracker.status());
        }
    }

    Ok(())
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| Error::InvalidConfig(format!("bad time {:?}: {}", value, e)))
}

fn cmd_history(data_dir: &PathBuf, config: &Config, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(config.history.recent_days);
    let now = chrono::Utc::now();
    let paths = spray_core::engine::DataPaths::new(data_dir);
    let events = load_recent_events(&paths.dose_log, &paths.csv, days, now)?;

    println!("Dose history (last {} days): {} doses", days, events.len());
    println!(
        "  Today: {} doses",
        spray_core::history::events_today(&events, now).len()
    );
    println!();

    for event in events.iter().rev() {
        println!(
            "  {}  {} (cycle {})",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.location_name,
            event.cycle
        );
    }

    Ok(())
}

fn cmd_rollup(data_dir: &PathBuf, cleanup: bool) -> Result<()> {
    let paths = spray_core::engine::DataPaths::new(data_dir);

    if !paths.dose_log.exists() {
        println!("No dose log found - nothing to roll up.");
        return Ok(());
    }

    let count = spray_core::csv_rollup::wal_to_csv_and_archive(&paths.dose_log, &paths.csv)?;

    println!("✓ Rolled up {} dose events to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let wal_dir = paths
            .dose_log
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| data_dir.clone());
        let cleaned = spray_core::csv_rollup::cleanup_processed_wals(&wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed log files", cleaned);
        }
    }

    Ok(())
}

fn cmd_watch(
    data_dir: &PathBuf,
    config: &Config,
    once: bool,
    auto_dismiss: bool,
    interval: Option<u64>,
) -> Result<()> {
    let mut tracker = open_tracker(data_dir, config)?;
    let poll_seconds = interval.unwrap_or(config.alerts.poll_seconds);

    if !tracker.state().schedule.enabled && !once {
        println!("Schedule is disabled - nothing to watch.");
        println!("Enable it with: spraytrack schedule set --enable");
        return Ok(());
    }

    if !once {
        println!(
            "Watching schedule (polling every {}s, Ctrl-C to stop)...",
            poll_seconds
        );
    }

    loop {
        if let Some(notice) = tracker.poll_alert() {
            display_alert(&notice);

            if auto_dismiss || once {
                tracker.dismiss_alert();
            } else {
                match prompt_alert_action()? {
                    AlertAction::Dismiss => tracker.dismiss_alert(),
                    AlertAction::Snooze => {
                        tracker.snooze_alert();
                        println!("Snoozed for {} minutes.", config.alerts.snooze_minutes);
                    }
                }
            }
        }

        if once {
            let status = tracker.status();
            print_schedule_status(&status);
            return Ok(());
        }

        std::thread::sleep(std::time::Duration::from_secs(poll_seconds));
    }
}

fn display_alert(notice: &AlertNotice) {
    println!("\n╭─────────────────────────────────────────╮");
    if notice.is_overdue {
        println!("│  ⏰ {}", notice.title);
    } else {
        println!("│  🔔 {}", notice.title);
    }
    println!("╰─────────────────────────────────────────╯");
    println!("  {}", notice.body);
    println!();
}

enum AlertAction {
    Dismiss,
    Snooze,
}

fn prompt_alert_action() -> Result<AlertAction> {
    println!("─────────────────────────────────────────");
    println!("Press Enter to dismiss");
    println!("  's' + Enter to snooze");
    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let action = match input.trim().to_lowercase().as_str() {
        "s" => AlertAction::Snooze,
        _ => AlertAction::Dismiss,
    };

    Ok(action)
}
