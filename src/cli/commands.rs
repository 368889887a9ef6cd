use std::time::Duration;

use crate::app::{AlmanacError, AppContext, Result};
use crate::config::ConfigError;
use crate::daemon::{Daemon, DaemonConfig};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let result = ctx.pipeline.execute().await?;

    if result.media_attached {
        println!("Posted {} (with image)", result.post_id);
    } else {
        println!("Posted {}", result.post_id);
    }
    if result.attempts > 1 {
        println!("  after {} attempts", result.attempts);
    }
    Ok(())
}

pub async fn preview(ctx: &AppContext) -> Result<()> {
    let (item, message) = ctx.pipeline.preview().await?;

    println!("{}", message);
    println!();
    println!(
        "({} / {} chars, item {})",
        message.char_count(),
        ctx.config.message.max_length,
        item.short_id()
    );
    Ok(())
}

pub async fn daemon(ctx: &AppContext, interval: Option<&str>, no_initial_run: bool) -> Result<()> {
    let interval = match interval {
        Some(s) => DaemonConfig::parse_interval(s).map(Duration::from_secs),
        None => ctx.config.daemon.interval(),
    }
    .map_err(|msg| AlmanacError::Config(ConfigError::Invalid(msg)))?;

    let run_on_start = ctx.config.daemon.run_on_start && !no_initial_run;

    println!(
        "Posting every {} (Ctrl-C to stop)",
        DaemonConfig::format_interval(interval.as_secs())
    );

    Daemon::new(ctx.pipeline.clone(), interval, run_on_start)
        .run()
        .await;
    Ok(())
}
