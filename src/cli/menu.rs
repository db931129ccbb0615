//! `punchcard menu` — interactive numbered menu, mirrors the CLI
//! subcommands for hands-on use.

use crate::config::ScheduleSettings;
use crate::domain::ActionKind;
use crate::services::{BatchRunner, SignScheduler};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

pub async fn run_menu(runner: Arc<BatchRunner>, schedule: &ScheduleSettings) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        print_menu(schedule);

        match rl.readline("\x1b[36mSelect option (1-4):\x1b[0m ") {
            Ok(line) => match line.trim() {
                "1" => {
                    println!("Starting registration...");
                    runner.run(ActionKind::Register).await;
                    pause(&mut rl);
                }
                "2" => {
                    println!("Starting sign...");
                    runner.run(ActionKind::Sign).await;
                    pause(&mut rl);
                }
                "3" => {
                    run_schedule_until_interrupt(Arc::clone(&runner), schedule).await;
                }
                "4" => {
                    println!("Exiting...");
                    break;
                }
                "" => continue,
                other => println!("Invalid choice: {}", other),
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    Ok(())
}

fn print_menu(schedule: &ScheduleSettings) {
    println!();
    println!("{}", "=".repeat(50));
    println!("BNB Chain check-in bot");
    println!("{}", "=".repeat(50));
    println!("1. Register accounts");
    println!("2. Sign once");
    println!(
        "3. Start sign scheduler (every {} minutes)",
        schedule.interval_minutes
    );
    println!("4. Exit");
    println!("{}", "=".repeat(50));
}

fn pause(rl: &mut DefaultEditor) {
    let _ = rl.readline("\nPress Enter to continue...");
}

// At the prompt rustyline owns the terminal and reports Ctrl+C as
// Interrupted; here the terminal is free, so the signal handler sees it
async fn run_schedule_until_interrupt(runner: Arc<BatchRunner>, schedule: &ScheduleSettings) {
    let handle = SignScheduler::new(runner, schedule).start();
    println!("Scheduler running, press Ctrl+C to stop...");

    if tokio::signal::ctrl_c().await.is_ok() {
        println!();
    }

    handle.stop().await;
    println!("Scheduler stopped");
}
